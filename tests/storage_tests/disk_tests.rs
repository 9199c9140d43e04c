//! Tests for DiskStore
//!
//! These tests verify:
//! - Save / load of frozen arrays
//! - Absence reported as `None`
//! - Atomic replacement and temp file cleanup
//! - Key to file name encoding, including digest-shortened long keys
//! - File format versions (LZF legacy files included) and corruption detection

use std::fs;

use bitbox::bitarray::SparseBitArray;
use bitbox::codec::{freeze, freeze_uncompressed, thaw, Compression, SerializedForm};
use bitbox::storage::{encode_file, encode_key, DiskStore, MAX_FILE_NAME_LEN, TEMP_SUFFIX};
use bitbox::BitboxError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_store() -> (TempDir, DiskStore) {
    let dir = TempDir::new().unwrap();
    let store = DiskStore::open(dir.path()).unwrap();
    (dir, store)
}

fn frozen_with_bits(bits: &[u64]) -> SerializedForm {
    let mut array = SparseBitArray::new("k", 0);
    for &bit in bits {
        array.set_bit(bit, 1);
    }
    freeze(&array)
}

fn legacy_file(is_compressed: bool, uncompressed_size: usize, payload: &[u8]) -> Vec<u8> {
    let mut contents = vec![is_compressed as u8];
    contents.extend_from_slice(&(uncompressed_size as i64).to_le_bytes());
    contents.extend_from_slice(payload);
    contents
}

fn temp_files(store: &DiskStore) -> Vec<String> {
    fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(TEMP_SUFFIX))
        .collect()
}

// =============================================================================
// Save / Load Tests
// =============================================================================

#[test]
fn test_load_missing_key_is_none() {
    let (_dir, store) = open_store();

    assert!(store.load("never-written").unwrap().is_none());
    assert!(!store.contains("never-written").unwrap());
}

#[test]
fn test_save_then_load() {
    let (_dir, store) = open_store();
    let frozen = frozen_with_bits(&[3, 1000, 1_000_000]);

    store.save("alpha", &frozen).unwrap();

    assert!(store.contains("alpha").unwrap());
    assert_eq!(store.load("alpha").unwrap(), Some(frozen));
}

#[test]
fn test_save_overwrites() {
    let (_dir, store) = open_store();

    store.save("k", &frozen_with_bits(&[1])).unwrap();
    store.save("k", &frozen_with_bits(&[2, 900])).unwrap();

    let loaded = store.load("k").unwrap().unwrap();
    let array = thaw("k", &loaded, 0).unwrap();
    assert_eq!(array.iter_ones().collect::<Vec<_>>(), vec![2, 900]);
}

#[test]
fn test_save_leaves_no_temp_files() {
    let (_dir, store) = open_store();

    for i in 0..10 {
        store.save(&format!("key{}", i), &frozen_with_bits(&[i])).unwrap();
    }

    assert!(temp_files(&store).is_empty());
}

#[test]
fn test_keys_are_independent() {
    let (_dir, store) = open_store();
    let a = frozen_with_bits(&[1]);
    let b = frozen_with_bits(&[2]);

    store.save("a", &a).unwrap();
    store.save("b", &b).unwrap();

    assert_eq!(store.load("a").unwrap(), Some(a));
    assert_eq!(store.load("b").unwrap(), Some(b));
}

#[test]
fn test_remove() {
    let (_dir, store) = open_store();
    store.save("gone", &frozen_with_bits(&[7])).unwrap();

    assert!(store.remove("gone").unwrap());
    assert!(!store.remove("gone").unwrap());
    assert!(store.load("gone").unwrap().is_none());
}

#[test]
fn test_reopen_sees_saved_files() {
    let dir = TempDir::new().unwrap();
    let frozen = frozen_with_bits(&[42]);

    {
        let store = DiskStore::open(dir.path()).unwrap();
        store.save("persist", &frozen).unwrap();
    }

    let store = DiskStore::open(dir.path()).unwrap();
    assert_eq!(store.load("persist").unwrap(), Some(frozen));
}

#[test]
fn test_repeated_saves_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = DiskStore::open(dir.path()).unwrap();
        for i in 0..20u64 {
            store.save("hot", &frozen_with_bits(&[i, i * 1000])).unwrap();
            store.save(&format!("cold{}", i), &frozen_with_bits(&[i])).unwrap();
        }
    }

    let store = DiskStore::open(dir.path()).unwrap();
    let hot = thaw("hot", &store.load("hot").unwrap().unwrap(), 0).unwrap();
    assert_eq!(hot.iter_ones().collect::<Vec<_>>(), vec![19, 19_000]);
    for i in 0..20u64 {
        assert!(store.contains(&format!("cold{}", i)).unwrap());
    }
    assert!(temp_files(&store).is_empty());
}

#[test]
fn test_open_removes_stale_temp_files() {
    let dir = TempDir::new().unwrap();
    {
        let store = DiskStore::open(dir.path()).unwrap();
        store.save("kept", &frozen_with_bits(&[1])).unwrap();
    }
    fs::write(dir.path().join(format!("kept{}", TEMP_SUFFIX)), b"partial").unwrap();
    fs::write(dir.path().join(format!("other{}", TEMP_SUFFIX)), b"partial").unwrap();

    let store = DiskStore::open(dir.path()).unwrap();

    assert!(temp_files(&store).is_empty());
    assert!(store.load("kept").unwrap().is_some());
}

#[test]
fn test_open_creates_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");

    let store = DiskStore::open(&nested).unwrap();

    assert!(nested.is_dir());
    assert_eq!(store.dir(), nested.as_path());
}

// =============================================================================
// Key Encoding Tests
// =============================================================================

#[test]
fn test_encode_plain_key_unchanged() {
    assert_eq!(encode_key("user_42-a").unwrap(), "user_42-a");
}

#[test]
fn test_encode_escapes_separators_and_dots() {
    assert_eq!(encode_key("a/b").unwrap(), "a%2Fb");
    assert_eq!(encode_key("..").unwrap(), "%2E%2E");
    assert_eq!(encode_key("x.tmp").unwrap(), "x%2Etmp");
}

#[test]
fn test_encode_escapes_utf8_bytes() {
    assert_eq!(encode_key("é").unwrap(), "%C3%A9");
}

#[test]
fn test_encoding_is_injective_for_escape_char() {
    // "%41" must not collide with "A"
    assert_ne!(encode_key("%41").unwrap(), encode_key("A").unwrap());
}

#[test]
fn test_encode_rejects_empty_key() {
    assert!(matches!(encode_key(""), Err(BitboxError::InvalidKey(_))));
}

#[test]
fn test_encode_long_key_is_bounded() {
    let fits = "a".repeat(MAX_FILE_NAME_LEN);
    let too_long = "a".repeat(MAX_FILE_NAME_LEN + 1);
    // each escaped byte takes three characters
    let escaped = "/".repeat(MAX_FILE_NAME_LEN / 3 + 1);

    assert_eq!(encode_key(&fits).unwrap(), fits);
    let cjk = "日本".repeat(100);
    for key in [too_long.as_str(), escaped.as_str(), cjk.as_str()] {
        let name = encode_key(key).unwrap();
        assert!(name.len() <= MAX_FILE_NAME_LEN, "{} bytes", name.len());
        assert!(name.contains('~'));
        assert!(!name.contains('.'));
        assert_eq!(encode_key(key).unwrap(), name);
    }
}

#[test]
fn test_encode_long_keys_with_shared_prefix_differ() {
    let base = "x".repeat(300);
    let a = format!("{}a", base);
    let b = format!("{}b", base);

    let name_a = encode_key(&a).unwrap();
    let name_b = encode_key(&b).unwrap();

    assert_ne!(name_a, name_b);
    // the readable prefix is shared, the digest is not
    assert_eq!(name_a.split('~').next(), name_b.split('~').next());
}

#[test]
fn test_long_key_save_load() {
    let (_dir, store) = open_store();
    let key = "k".repeat(1000);
    let frozen = frozen_with_bits(&[12, 4096]);

    store.save(&key, &frozen).unwrap();

    assert!(store.contains(&key).unwrap());
    assert_eq!(store.load(&key).unwrap(), Some(frozen));
    assert!(store.load(&format!("{}k", key)).unwrap().is_none());
}

#[test]
fn test_key_with_dots_never_looks_like_temp_file() {
    let (_dir, store) = open_store();

    store.save("name.tmp", &frozen_with_bits(&[1])).unwrap();

    assert!(temp_files(&store).is_empty());
    // reopening must not sweep the saved file away
    let store = DiskStore::open(store.dir()).unwrap();
    assert!(store.load("name.tmp").unwrap().is_some());
}

// =============================================================================
// File Format Tests
// =============================================================================

#[test]
fn test_file_layout() {
    let frozen = freeze_uncompressed(&SparseBitArray::new("k", 0));

    let contents = encode_file(&frozen);

    // version 1, uncompressed
    assert_eq!(contents[0], 0x10);
    assert_eq!(&contents[1..9], &(frozen.uncompressed_size as i64).to_le_bytes());
    assert_eq!(&contents[9..contents.len() - 4], frozen.payload.as_slice());
    assert_eq!(
        &contents[contents.len() - 4..],
        &crc32fast::hash(&frozen.payload).to_le_bytes()
    );
}

#[test]
fn test_compressed_flag_written() {
    let frozen = frozen_with_bits(&[0, 1_000_000]);
    assert!(frozen.is_compressed());

    assert_eq!(encode_file(&frozen)[0], 0x11);
}

#[test]
fn test_legacy_uncompressed_file_is_readable() {
    let (_dir, store) = open_store();
    let mut array = SparseBitArray::new("old", 0);
    array.set_bit(17, 1);
    let raw = freeze_uncompressed(&array).payload;
    fs::write(store.path_for("old").unwrap(), legacy_file(false, raw.len(), &raw)).unwrap();

    let loaded = store.load("old").unwrap().unwrap();
    let thawed = thaw("old", &loaded, 0).unwrap();

    assert_eq!(loaded.compression, Compression::None);
    assert!(thawed.peek_bit(17));
}

#[test]
fn test_legacy_compressed_file_is_readable() {
    let (_dir, store) = open_store();
    let array = {
        let mut array = SparseBitArray::new("old", 0);
        array.set_bit(9, 1);
        array.set_bit(700_000, 1);
        array
    };
    let raw = freeze_uncompressed(&array).payload;
    let compressed = lzf::compress(&raw).unwrap();
    fs::write(
        store.path_for("old").unwrap(),
        legacy_file(true, raw.len(), &compressed),
    )
    .unwrap();

    let loaded = store.load("old").unwrap().unwrap();
    let thawed = thaw("old", &loaded, 0).unwrap();

    assert_eq!(loaded.compression, Compression::Lzf);
    assert_eq!(loaded.uncompressed_size, raw.len() as u64);
    assert_eq!(thawed.iter_ones().collect::<Vec<_>>(), vec![9, 700_000]);
}

#[test]
fn test_lzf_form_is_saved_in_legacy_layout() {
    let (_dir, store) = open_store();
    let raw = freeze_uncompressed(&{
        let mut array = SparseBitArray::new("old", 0);
        array.set_bit(300_000, 1);
        array
    })
    .payload;
    let frozen = SerializedForm {
        compression: Compression::Lzf,
        uncompressed_size: raw.len() as u64,
        payload: lzf::compress(&raw).unwrap(),
    };

    let contents = encode_file(&frozen);
    assert_eq!(contents[0], 0x01);
    assert_eq!(contents.len(), 9 + frozen.payload.len());

    store.save("old", &frozen).unwrap();
    assert_eq!(store.load("old").unwrap(), Some(frozen));
}

#[test]
fn test_legacy_compressed_garbage_is_corruption() {
    let (_dir, store) = open_store();
    let path = store.path_for("old").unwrap();
    fs::write(&path, legacy_file(true, 64, &[0xFF; 8])).unwrap();

    let loaded = store.load("old").unwrap().unwrap();

    assert!(matches!(thaw("old", &loaded, 0), Err(BitboxError::Corruption(_))));
}

#[test]
fn test_future_version_is_unsupported() {
    let (_dir, store) = open_store();
    let mut contents = encode_file(&frozen_with_bits(&[1]));
    contents[0] = 0x20;
    fs::write(store.path_for("k").unwrap(), contents).unwrap();

    assert!(matches!(
        store.load("k"),
        Err(BitboxError::UnsupportedFormat(0x20))
    ));
}

#[test]
fn test_reserved_flag_bits_are_unsupported() {
    let (_dir, store) = open_store();
    let mut contents = encode_file(&frozen_with_bits(&[1]));
    contents[0] |= 0x04;
    fs::write(store.path_for("k").unwrap(), contents).unwrap();

    assert!(matches!(store.load("k"), Err(BitboxError::UnsupportedFormat(_))));
}

#[test]
fn test_checksum_mismatch_is_corruption() {
    let (_dir, store) = open_store();
    store.save("k", &frozen_with_bits(&[5, 600])).unwrap();
    let path = store.path_for("k").unwrap();
    let mut contents = fs::read(&path).unwrap();
    contents[10] ^= 0xFF;
    fs::write(&path, contents).unwrap();

    assert!(matches!(store.load("k"), Err(BitboxError::Corruption(_))));
}

#[test]
fn test_truncated_file_is_corruption() {
    let (_dir, store) = open_store();
    store.save("k", &frozen_with_bits(&[5, 600])).unwrap();
    let path = store.path_for("k").unwrap();
    let contents = fs::read(&path).unwrap();

    fs::write(&path, &contents[..contents.len() - 2]).unwrap();
    assert!(matches!(store.load("k"), Err(BitboxError::Corruption(_))));

    fs::write(&path, &contents[..5]).unwrap();
    assert!(matches!(store.load("k"), Err(BitboxError::Corruption(_))));

    fs::write(&path, &contents[..10]).unwrap();
    assert!(matches!(store.load("k"), Err(BitboxError::Corruption(_))));
}

#[test]
fn test_negative_size_is_corruption() {
    let (_dir, store) = open_store();
    let mut contents = vec![0x10];
    contents.extend_from_slice(&(-1i64).to_le_bytes());
    contents.extend_from_slice(&crc32fast::hash(&[]).to_le_bytes());
    fs::write(store.path_for("k").unwrap(), contents).unwrap();

    assert!(matches!(store.load("k"), Err(BitboxError::Corruption(_))));
}
