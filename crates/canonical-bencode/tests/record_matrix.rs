use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use canonical_bencode::{
    clear_metadata_cache, decode, decode_into, encode, impl_record, ByteBuf, Decoder, ErrorKind,
    MetadataCache, Value,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Info {
    pieces: ByteBuf,
    piece_length: i64,
    length: i64,
    name: String,
}

impl_record!(Info {
    pieces: "pieces,omitempty",
    piece_length: "piece length",
    length: "length",
    name: "name",
});

#[derive(Debug, Default, Clone, PartialEq)]
struct Metainfo {
    announce: String,
    announce_list: Vec<Vec<String>>,
    comment: String,
    info: Info,
}

impl_record!(Metainfo {
    announce: "announce",
    announce_list: "announce-list",
    comment: "comment",
    info: "info",
});

const TORRENT: &[u8] = b"d8:announce38:udp://tracker.publicbt.com:80/announce13:announce-listll38:udp://tracker.publicbt.com:80/announceel44:udp://tracker.openbittorrent.com:80/announceee7:comment33:Debian CD from cdimage.debian.org4:infod6:lengthi170917888e4:name30:debian-8.8.0-arm64-netinst.iso12:piece lengthi262144eee";

fn debian() -> Metainfo {
    Metainfo {
        announce: "udp://tracker.publicbt.com:80/announce".into(),
        announce_list: vec![
            vec!["udp://tracker.publicbt.com:80/announce".into()],
            vec!["udp://tracker.openbittorrent.com:80/announce".into()],
        ],
        comment: "Debian CD from cdimage.debian.org".into(),
        info: Info {
            pieces: ByteBuf::new(),
            piece_length: 262_144,
            length: 170_917_888,
            name: "debian-8.8.0-arm64-netinst.iso".into(),
        },
    }
}

#[test]
fn torrent_metainfo_round_trip() {
    let mut decoded = Metainfo::default();
    decode_into(TORRENT, &mut decoded).unwrap();
    assert_eq!(decoded, debian());
    assert_eq!(encode(&decoded).unwrap(), TORRENT);
}

#[test]
fn torrent_with_pieces_keeps_binary_payload() {
    let mut meta = debian();
    meta.info.pieces = ByteBuf::from(vec![0x00, 0xff, 0x10, 0x80]);
    let bytes = encode(&meta).unwrap();

    let value = decode(&bytes).unwrap();
    let info = value.get("info").unwrap();
    assert_eq!(
        info.get("pieces").and_then(Value::as_bytes),
        Some(&[0x00, 0xff, 0x10, 0x80][..])
    );

    let mut back = Metainfo::default();
    decode_into(&bytes, &mut back).unwrap();
    assert_eq!(back, meta);
}

#[derive(Debug, Default, PartialEq)]
struct Person {
    name: String,
    age: i8,
    email: Option<String>,
    tags: Vec<String>,
}

impl_record!(Person {
    name: "name,required",
    age: "age, required",
    email,
    tags: "tags,omitempty",
});

#[test]
fn missing_required_field_names_first_wire_key() {
    let mut p = Person::default();
    let err = decode_into(b"d5:email3:a@be", &mut p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmarshalRequiredFieldMissing);
    assert_eq!(err.field(), Some("age"));
}

#[test]
fn overflow_is_reported_with_field_chain() {
    let mut p = Person::default();
    let err = decode_into(b"d3:agei99999999999e4:name1:xe", &mut p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmarshalOverflow);
    assert_eq!(
        err.to_string(),
        "field \"age\": unmarshal overflow: value 99999999999 overflows i8"
    );
}

#[test]
fn absent_optional_fields_are_left_untouched() {
    let mut p = Person {
        email: Some("keep@me".into()),
        ..Person::default()
    };
    decode_into(b"d3:agei30e4:name3:anne", &mut p).unwrap();
    assert_eq!(
        p,
        Person {
            name: "ann".into(),
            age: 30,
            email: Some("keep@me".into()),
            tags: vec![],
        }
    );
}

#[test]
fn unknown_keys_are_ignored() {
    let mut p = Person::default();
    decode_into(b"d3:agei1e5:extrai9e4:name1:x4:tagsl1:aee", &mut p).unwrap();
    assert_eq!(p.tags, vec!["a".to_owned()]);
}

#[test]
fn type_mismatch_inside_list_field() {
    let mut p = Person::default();
    let err = decode_into(b"d3:agei1e4:name1:x4:tagsl1:ai2eee", &mut p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmarshalType);
    assert_eq!(err.field(), Some("tags"));
    assert_eq!(err.root().field(), None);
    assert!(err.to_string().starts_with("field \"tags\": field \"1\": "));
}

#[test]
fn record_from_non_dictionary_is_a_mismatch() {
    let mut p = Person::default();
    let err = decode_into(b"li1ee", &mut p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmarshalType);
}

#[test]
fn typed_maps_and_values() {
    let mut scores: HashMap<String, u32> = HashMap::new();
    decode_into(b"d3:anni1e3:bobi2ee", &mut scores).unwrap();
    assert_eq!(scores.get("bob"), Some(&2));

    let mut raw: BTreeMap<ByteBuf, Value> = BTreeMap::new();
    decode_into(b"d1:\xffli1eee", &mut raw).unwrap();
    assert_eq!(
        raw.get(&ByteBuf::from(vec![0xff])),
        Some(&Value::List(vec![Value::Integer(1)]))
    );

    let mut bad: HashMap<i64, String> = HashMap::new();
    let err = decode_into(b"de", &mut bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmarshalMapKey);
}

#[test]
fn streaming_records_share_an_injected_cache() {
    let cache = Arc::new(MetadataCache::new());
    let mut stream = Vec::new();
    stream.extend_from_slice(TORRENT);
    stream.extend_from_slice(b"d3:agei2e4:name1:ye");

    let mut dec = Decoder::from_slice(&stream).with_cache(Arc::clone(&cache));
    let mut meta = Metainfo::default();
    dec.decode_next_into(&mut meta).unwrap();
    let mut person = Person::default();
    dec.decode_next_into(&mut person).unwrap();

    assert_eq!(meta, debian());
    assert_eq!(person.name, "y");
    assert!(cache.contains::<Metainfo>());
    assert!(cache.contains::<Info>());
    assert!(cache.contains::<Person>());
    assert_eq!(cache.len(), 3);
    assert!(dec.decode_next().unwrap_err().is_null_root());
}

#[test]
fn clearing_the_global_cache_repopulates_on_use() {
    clear_metadata_cache();
    let mut meta = Metainfo::default();
    decode_into(TORRENT, &mut meta).unwrap();
    assert!(MetadataCache::global().contains::<Metainfo>());
    assert!(MetadataCache::global().contains::<Info>());

    clear_metadata_cache();
    assert_eq!(encode(&meta).unwrap(), TORRENT);
}

#[derive(Debug, Default, PartialEq)]
struct Dashed {
    label: String,
    weight: i64,
}

impl_record!(Dashed {
    label: "-",
    weight: "w",
});

#[test]
fn dash_tag_keeps_the_field_name() {
    let cache = Arc::new(MetadataCache::new());
    let layout = cache.resolve::<Dashed>().unwrap();
    let keys: Vec<_> = layout.fields().iter().map(|f| f.key()).collect();
    assert_eq!(keys, ["label", "w"]);
    assert!(!layout.fields()[0].required());

    let value = Dashed {
        label: "x".into(),
        weight: 3,
    };
    let bytes = encode(&value).unwrap();
    assert_eq!(bytes, b"d5:label1:x1:wi3ee");

    let mut back = Dashed::default();
    decode_into(&bytes, &mut back).unwrap();
    assert_eq!(back, value);
}
