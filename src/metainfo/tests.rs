use super::*;
use crate::bencode::{decode, encode};
use sha1::{Digest, Sha1};

fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[test]
fn test_info_hash_hex_roundtrip() {
    let hash = InfoHash::from_bytes(&[0xab; 20]).unwrap();
    let hex = hash.to_hex();

    assert_eq!(hex.len(), 40);
    assert_eq!(hex, hex.to_lowercase());
    assert_eq!(InfoHash::from_hex(&hex).unwrap(), hash);
}

#[test]
fn test_info_hash_invalid() {
    assert!(InfoHash::from_bytes(&[0u8; 19]).is_err());
    assert!(InfoHash::from_hex("abcd").is_err());
    assert!(InfoHash::from_hex(&"zz".repeat(20)).is_err());
}

#[test]
fn test_info_hash_of() {
    let data = b"d4:name4:teste";
    assert_eq!(*InfoHash::of(data).as_bytes(), sha1(data));
}

#[test]
fn test_parse_single_file() {
    let info = b"d6:lengthi2048e4:name10:ubuntu.iso12:piece lengthi512ee";
    let hash = InfoHash::of(info);
    let torrent = Torrent::from_info_bytes(info, hash).unwrap();

    assert_eq!(torrent.name, "ubuntu.iso");
    assert_eq!(torrent.total_length, 2048);
    assert_eq!(torrent.piece_length, 512);
    assert_eq!(torrent.files_count(), 1);
    assert_eq!(
        torrent.files[0],
        TorrentFile {
            name: "ubuntu.iso".into(),
            length: 2048
        }
    );
}

#[test]
fn test_parse_multi_file() {
    let info = b"d5:filesld6:lengthi100e4:pathl6:a.flaceed6:lengthi200e4:pathl3:sub6:b.flaceee4:name5:album12:piece lengthi16384ee";
    let hash = InfoHash::of(info);
    let torrent = Torrent::from_info_bytes(info, hash).unwrap();

    assert_eq!(torrent.name, "album");
    assert_eq!(torrent.total_length, 300);
    assert_eq!(torrent.files_count(), 2);
    assert_eq!(torrent.files[0].name, "a.flac");
    assert_eq!(torrent.files[0].length, 100);
    assert_eq!(torrent.files[1].name, "sub/b.flac");
    assert_eq!(torrent.files[1].length, 200);
}

#[test]
fn test_parse_prefers_utf8_name() {
    let info = b"d4:name3:old10:name.utf-83:newe";
    let torrent = Torrent::from_info_bytes(info, InfoHash::of(info)).unwrap();
    assert_eq!(torrent.name, "new");
}

#[test]
fn test_parse_synthetic_entry_when_no_files() {
    let info = b"d4:name4:teste";
    let torrent = Torrent::from_info_bytes(info, InfoHash::of(info)).unwrap();

    assert_eq!(torrent.files_count(), 1);
    assert_eq!(torrent.files[0].name, "test");
    assert_eq!(torrent.files[0].length, 0);
}

#[test]
fn test_parse_rejects_non_dict() {
    assert!(Torrent::from_info_bytes(b"i42e", InfoHash([0u8; 20])).is_err());
    assert!(Torrent::from_info_bytes(b"garbage", InfoHash([0u8; 20])).is_err());
}

#[test]
fn test_files_json_shape() {
    let info = b"d6:lengthi7e4:name3:abce";
    let torrent = Torrent::from_info_bytes(info, InfoHash::of(info)).unwrap();
    let json = serde_json::to_string(&torrent.files).unwrap();
    assert_eq!(json, r#"[{"name":"abc","length":7}]"#);
}

#[test]
fn test_sanitized_name() {
    let info = b"d4:name9:a/b\\c\x00def4:junki0ee";
    let torrent = Torrent::from_info_bytes(info, InfoHash::of(info)).unwrap();
    assert_eq!(torrent.sanitized_name(), "a_b_c_def");
}

#[test]
fn test_canonical_reencode_preserves_hash() {
    let info: &[u8] = b"d6:lengthi2048e4:name10:ubuntu.iso12:piece lengthi512ee";
    let value = decode(info).unwrap();
    let reencoded = encode(&value);

    assert_eq!(InfoHash::of(&reencoded), InfoHash::of(info));
}

#[test]
fn test_torrent_file_bytes_wraps_info() {
    let info = b"d4:name4:teste";
    let wrapped = torrent_file_bytes(info);

    assert!(wrapped.starts_with(b"d4:info"));
    assert!(wrapped.ends_with(b"e"));

    let value = decode(&wrapped).unwrap();
    let inner = value.get(b"info").unwrap();
    assert_eq!(encode(inner), info);
}
