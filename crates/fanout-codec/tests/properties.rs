use std::collections::BTreeMap;

use fanout_codec::{
    decode_array, decode_object, encode_array, encode_object, is_sentinel, Dtype, NdArray,
};
use proptest::prelude::*;
use serde_json::Value;

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|map: BTreeMap<String, Value>| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn array() -> impl Strategy<Value = NdArray> {
    (
        prop::sample::select(Dtype::ALL.to_vec()),
        prop::collection::vec(0usize..5, 1..5),
    )
        .prop_flat_map(|(dtype, shape)| {
            let len = shape.iter().product::<usize>() * dtype.width();
            prop::collection::vec(any::<u8>(), len)
                .prop_map(move |data| NdArray::new(dtype, shape.clone(), data).unwrap())
        })
}

proptest! {
    #[test]
    fn object_roundtrip(value in json_value()) {
        let frame = encode_object(&value).unwrap();
        prop_assert_eq!(decode_object::<Value>(&frame).unwrap(), value);
    }

    #[test]
    fn object_frames_never_equal_sentinel(value in json_value()) {
        let frame = encode_object(&value).unwrap();
        prop_assert!(!is_sentinel(&frame));
    }

    #[test]
    fn array_roundtrip_is_bit_exact(array in array()) {
        let (meta, raw) = encode_array(&array);
        prop_assert!(!is_sentinel(&meta));
        let decoded = decode_array(&meta, raw).unwrap();
        prop_assert_eq!(decoded.as_bytes(), array.as_bytes());
        prop_assert_eq!(decoded, array);
    }
}
