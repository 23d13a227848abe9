use super::*;
use crate::error::ErrorKind;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves queued responses in order; the last one repeats.
struct ScriptedClient {
    responses: Mutex<VecDeque<(u32, Vec<u8>)>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(responses: Vec<(u32, Vec<u8>)>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn serving(body: &[u8]) -> Self {
        Self::new(vec![(200, body.to_vec())])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpClient for ScriptedClient {
    fn get(&self, _url: &str, body: &mut dyn Write) -> Result<u32, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut q = self.responses.lock().unwrap();
        let (code, data) = if q.len() > 1 {
            q.pop_front().unwrap()
        } else {
            q.front().cloned().unwrap()
        };
        body.write_all(&data).unwrap();
        Ok(code)
    }
}

/// Counts unpack calls, delegating to the real tar.gz unpacker.
#[derive(Default)]
struct CountingUnpacker {
    calls: AtomicUsize,
}

impl Unpacker for CountingUnpacker {
    fn unpack(&self, reader: &mut dyn io::Read, dest: &Path) -> Result<Vec<PathBuf>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        TarGzUnpacker.unpack(reader, dest)
    }
}

fn image_tar_gz() -> Vec<u8> {
    let enc = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(enc);
    for (path, data) in [("box.ovf", &b"<ovf/>"[..]), ("disk1.vmdk", &b"disk-bytes"[..])] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn sha256(data: &[u8]) -> String {
    checksum::digest_reader(DigestAlgorithm::Sha256, &mut &data[..]).unwrap()
}

fn request(dir: &Path, digest: &str) -> FetchRequest {
    FetchRequest::new("https://host/path/image.tar.gz", digest, "sha256").with_download_dir(dir)
}

fn fetcher(client: ScriptedClient) -> Fetcher<ScriptedClient, CountingUnpacker> {
    Fetcher::with_unpacker(client, CountingUnpacker::default())
}

#[test]
fn fetch_downloads_verifies_and_unpacks() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));

    let out = f.fetch_file(&request(dir.path(), &digest)).unwrap();

    assert_eq!(out, dir.path().join(&digest));
    assert_eq!(fs::read(out.join("box.ovf")).unwrap(), b"<ovf/>");
    assert_eq!(fs::read(dir.path().join("image.tar.gz")).unwrap(), body);
    assert_eq!(f.client().calls(), 1);
    assert_eq!(f.unpacker.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn second_fetch_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));
    let req = request(dir.path(), &digest);

    let first = f.fetch_file(&req).unwrap();
    let second = f.fetch_file(&req).unwrap();

    assert_eq!(first, second);
    assert_eq!(f.client().calls(), 1, "second fetch must not hit the network");
    assert_eq!(f.unpacker.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn corrupted_cache_is_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));
    let req = request(dir.path(), &digest);

    f.fetch_file(&req).unwrap();
    fs::write(dir.path().join("image.tar.gz"), b"tampered").unwrap();

    let out = f.fetch_file(&req).unwrap();
    assert_eq!(out, dir.path().join(&digest));
    assert_eq!(f.client().calls(), 2);
    assert_eq!(fs::read(dir.path().join("image.tar.gz")).unwrap(), body);
}

#[test]
fn populated_extract_dir_skips_unpack_even_after_redownload() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let extract_dir = dir.path().join(&digest);
    fs::create_dir_all(&extract_dir).unwrap();
    fs::write(extract_dir.join("marker"), b"already here").unwrap();
    fs::write(dir.path().join("image.tar.gz"), b"stale").unwrap();

    let f = fetcher(ScriptedClient::serving(&body));
    let out = f.fetch_file(&request(dir.path(), &digest)).unwrap();

    assert_eq!(out, extract_dir);
    assert_eq!(f.client().calls(), 1);
    assert_eq!(f.unpacker.calls.load(Ordering::SeqCst), 0);
    assert!(!extract_dir.join("box.ovf").exists());
}

#[test]
fn empty_extract_dir_is_unpacked() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    fs::create_dir_all(dir.path().join(&digest)).unwrap();

    let f = fetcher(ScriptedClient::serving(&body));
    let out = f.fetch_file(&request(dir.path(), &digest)).unwrap();
    assert!(out.join("disk1.vmdk").exists());
    assert_eq!(f.unpacker.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn persistent_mismatch_retries_once_then_fails() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let wrong = sha256(b"something else");
    let f = fetcher(ScriptedClient::serving(&body));

    let err = f.fetch_file(&request(dir.path(), &wrong)).unwrap_err();

    assert!(matches!(err, FetchError::ChecksumMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(f.client().calls(), 2);
    assert!(!dir.path().join(&wrong).exists());
    assert_eq!(f.unpacker.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn bad_first_download_recovers_on_retry() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::new(vec![
        (200, b"truncated".to_vec()),
        (200, body.clone()),
    ]));

    let out = f.fetch_file(&request(dir.path(), &digest)).unwrap();
    assert!(out.join("box.ovf").exists());
    assert_eq!(f.client().calls(), 2);
}

#[test]
fn not_found_leaves_no_cached_file() {
    let dir = tempfile::tempdir().unwrap();
    let f = fetcher(ScriptedClient::new(vec![(404, b"nope".to_vec())]));

    let err = f.fetch_file(&request(dir.path(), "abc123")).unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus { code: 404, .. }));
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(!dir.path().join("image.tar.gz").exists());
    assert!(!dir.path().join("image.tar.gz.part").exists());
    assert_eq!(f.client().calls(), 1);
}

#[test]
fn invalid_request_fails_before_any_io() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    let f = fetcher(ScriptedClient::serving(b""));
    let base = request(&cache, "abc123");

    let mut no_url = base.clone();
    no_url.source_url.clear();
    let mut no_digest = base.clone();
    no_digest.expected_digest.clear();
    let mut no_alg = base.clone();
    no_alg.digest_algorithm.clear();

    for req in [no_url, no_digest, no_alg] {
        let err = f.fetch_file(&req).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
    assert_eq!(f.client().calls(), 0);
    assert!(!cache.exists());
}

#[test]
fn unsupported_algorithm_fails_before_any_io() {
    let dir = tempfile::tempdir().unwrap();
    let f = fetcher(ScriptedClient::serving(b""));
    let mut req = request(dir.path(), "abc123");
    req.digest_algorithm = "crc32".into();

    let err = f.fetch_file(&req).unwrap_err();
    assert!(matches!(err, FetchError::UnsupportedAlgorithm(_)));
    assert_eq!(f.client().calls(), 0);
}

#[test]
fn verified_non_archive_is_archive_error() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"plain text, not gzip".to_vec();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));

    let err = f.fetch_file(&request(dir.path(), &digest)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Archive);
}

#[test]
fn url_without_basename_is_cached_as_unnamed() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));
    let req = FetchRequest::new("https://host/images/", &digest, "SHA-256")
        .with_download_dir(dir.path());

    f.fetch_file(&req).unwrap();
    assert!(dir.path().join("unnamed").is_file());
}

#[test]
fn concurrent_fetches_download_once() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));
    let req = request(dir.path(), &digest);

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| f.fetch_file(&req))).collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), dir.path().join(&digest));
        }
    });

    assert_eq!(f.client().calls(), 1);
    assert_eq!(f.unpacker.calls.load(Ordering::SeqCst), 1);
}

fn archive_with_escaping_entry() -> Vec<u8> {
    let enc = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(enc);

    let good = b"fine";
    let mut header = tar::Header::new_gnu();
    header.set_size(good.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "good.txt", &good[..]).unwrap();

    let evil = b"owned";
    let mut header = tar::Header::new_old();
    let name = b"../evil.txt";
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_size(evil.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, &evil[..]).unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

#[test]
fn failed_unpack_does_not_leave_a_trusted_extract_dir() {
    let dir = tempfile::tempdir().unwrap();
    let body = archive_with_escaping_entry();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));
    let req = request(dir.path(), &digest);

    let first = f.fetch_file(&req).unwrap_err();
    assert!(matches!(first, FetchError::UnsafeEntry { .. }), "{first:?}");
    assert!(!dir.path().join(&digest).exists());

    let second = f.fetch_file(&req).unwrap_err();
    assert_eq!(second.kind(), ErrorKind::Archive);
    assert_eq!(f.unpacker.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn basename_equal_to_digest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let body = image_tar_gz();
    let digest = sha256(&body);
    let f = fetcher(ScriptedClient::serving(&body));
    let req = FetchRequest::new(format!("https://host/blobs/{digest}"), &digest, "sha256")
        .with_download_dir(dir.path());

    let err = f.fetch_file(&req).unwrap_err();
    assert!(matches!(err, FetchError::PathCollision { .. }), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(f.client().calls(), 0);
}
