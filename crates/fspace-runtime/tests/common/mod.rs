//! Shared fixtures for fspace-runtime integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use fspace_runtime::{
    MemoryObjectStore, ObjectStore, SignError, SignatureVerifier, SignedFile, Signer, StoreError,
    StoreResult, UnsignedFile, UploadOptions,
};

pub const OWNER: &str = "0xA11CE";

/// Signature is `sig(<normalized key>|<payload len>|<payload checksum>)`.
/// Not cryptography; it only lets tests detect tampering and foreign keys.
pub struct ChecksumSigner {
    key: String,
}

impl ChecksumSigner {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

fn checksum_signature(public_key: &str, data: &str) -> String {
    let sum = data
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    format!(
        "sig({}|{}|{sum:08x})",
        public_key.trim().to_lowercase(),
        data.len()
    )
}

impl Signer for ChecksumSigner {
    fn public_key(&self) -> &str {
        &self.key
    }

    fn sign(&self, file: UnsignedFile) -> Result<SignedFile, SignError> {
        let signature = checksum_signature(&file.public_key, &file.file_data);
        Ok(file.into_signed(signature))
    }
}

pub struct ChecksumVerifier;

impl SignatureVerifier for ChecksumVerifier {
    fn validate_signable(&self, file: &SignedFile) -> bool {
        file.signature == checksum_signature(&file.public_key, &file.file_data)
    }
}

/// Wraps a [`MemoryObjectStore`]; uploads fail while `failing` is set and
/// can be made to suspend once before completing.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryObjectStore,
    pub failing: AtomicBool,
    pub suspend_uploads: AtomicBool,
    pub uploads: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub fn suspend(&self, on: bool) {
        self.suspend_uploads.store(on, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

/// Pending on the first poll, then yields `value`.
pub struct YieldOnce<T> {
    value: Option<T>,
    yielded: bool,
}

impl<T> YieldOnce<T> {
    pub fn new(value: T, suspend: bool) -> Self {
        Self {
            value: Some(value),
            yielded: !suspend,
        }
    }
}

impl<T: Unpin> Future for YieldOnce<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if !self.yielded {
            self.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        match self.value.take() {
            Some(value) => Poll::Ready(value),
            None => Poll::Pending,
        }
    }
}

impl ObjectStore for FlakyStore {
    fn name(&self) -> &str {
        "FlakyStore"
    }

    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let _ = self.uploads.fetch_add(1, Ordering::SeqCst);
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("network unreachable".into()))
        } else {
            pollster::block_on(self.inner.upload(path, bytes, options))
        };
        YieldOnce::new(result, self.suspend_uploads.load(Ordering::SeqCst))
    }

    fn download(&self, path: &str) -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send {
        self.inner.download(path)
    }

    fn list(&self, prefix: &str) -> impl Future<Output = StoreResult<Vec<String>>> + Send {
        self.inner.list(prefix)
    }
}
