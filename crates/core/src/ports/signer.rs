//! Port for transaction signing. No keypair or HSM implementation lives in
//! this workspace.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign a raw, serialized transaction and return the signed bytes.
    async fn sign(&self, tx_bytes: &[u8]) -> Result<Vec<u8>>;

    fn public_key(&self) -> String;
}
