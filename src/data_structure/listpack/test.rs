#[cfg(test)]
mod test {
    use crate::data_structure::listpack::error::ListPackError;
    use crate::data_structure::listpack::lib::{
        backlen_size, decode_backlen, encode_backlen, encode_entry,
    };
    use crate::data_structure::listpack::listpack::{ListPack, LpWhere};
    use crate::data_structure::listpack::{string_to_int, LpValue, LP_HDR_SIZE};
    use rand::Rng;

    fn create() -> ListPack {
        let mut lp = ListPack::new();
        lp.append(b"foo").unwrap();
        lp.append(b"quux").unwrap();
        lp.prepend(b"hello").unwrap();
        lp.append(b"1024").unwrap();
        lp
    }

    fn values(lp: &ListPack) -> Vec<Vec<u8>> {
        lp.iter().map(|v| v.to_vec()).collect()
    }

    fn rand_bytes(len: usize) -> Vec<u8> {
        let mut rng = rand::rng();
        (0..len).map(|_| rng.random_range(b'a'..=b'z')).collect()
    }

    #[test]
    fn empty_listpack() {
        let lp = ListPack::new();
        assert_eq!(lp.bytes(), LP_HDR_SIZE + 1);
        assert_eq!(lp.length(), 0);
        assert!(lp.is_empty());
        assert_eq!(lp.first(), None);
        assert_eq!(lp.last(), None);
        assert_eq!(lp.seek(0), None);
        assert_eq!(lp.seek(-1), None);
    }

    #[test]
    fn push_and_read_back() {
        let lp = create();
        assert_eq!(lp.length(), 4);
        assert_eq!(
            values(&lp),
            vec![b"hello".to_vec(), b"foo".to_vec(), b"quux".to_vec(), b"1024".to_vec()]
        );
        let last = lp.last().unwrap();
        assert_eq!(lp.get(last), Some(LpValue::Int(1024)));
        assert!(lp.compare(last, b"1024"));
        assert!(!lp.compare(last, b"01024"));
        assert!(lp.compare(lp.first().unwrap(), b"hello"));
    }

    #[test]
    fn string_to_int_is_strict() {
        assert_eq!(string_to_int(b"0"), Some(0));
        assert_eq!(string_to_int(b"-1"), Some(-1));
        assert_eq!(string_to_int(b"9223372036854775807"), Some(i64::MAX));
        assert_eq!(string_to_int(b"-9223372036854775808"), Some(i64::MIN));
        assert_eq!(string_to_int(b"9223372036854775808"), None);
        assert_eq!(string_to_int(b"-9223372036854775809"), None);
        assert_eq!(string_to_int(b"007"), None);
        assert_eq!(string_to_int(b"-0"), None);
        assert_eq!(string_to_int(b"+1"), None);
        assert_eq!(string_to_int(b" 1"), None);
        assert_eq!(string_to_int(b"1a"), None);
        assert_eq!(string_to_int(b""), None);
        assert_eq!(string_to_int(b"-"), None);
    }

    #[test]
    fn integer_encodings() {
        let cases: [(i64, usize); 14] = [
            (0, 1),
            (127, 1),
            (128, 2),
            (-1, 2),
            (4095, 2),
            (-4096, 2),
            (4096, 3),
            (-32768, 3),
            (32768, 4),
            (-8388608, 4),
            (8388608, 5),
            (i32::MIN as i64, 5),
            (i32::MAX as i64 + 1, 9),
            (i64::MIN, 9),
        ];
        for (v, encoded) in cases {
            let entry = encode_entry(v.to_string().as_bytes()).unwrap();
            assert_eq!(entry.len(), encoded + 1, "value {v}");

            let mut lp = ListPack::new();
            lp.append(v.to_string().as_bytes()).unwrap();
            lp.prepend(b"x").unwrap();
            assert_eq!(lp.get(lp.last().unwrap()), Some(LpValue::Int(v)), "value {v}");
            assert_eq!(lp.prev(lp.last().unwrap()), lp.first());
        }
    }

    #[test]
    fn string_encodings() {
        for len in [0usize, 1, 63, 64, 200, 4095, 4096, 20000] {
            let s = rand_bytes(len);
            let mut lp = ListPack::new();
            lp.append(b"head").unwrap();
            lp.append(&s).unwrap();
            lp.append(b"tail").unwrap();
            lp.validate_integrity(true).unwrap();

            let mid = lp.seek(1).unwrap();
            assert_eq!(lp.get(mid), Some(LpValue::Str(&s)));
            assert_eq!(lp.prev(lp.last().unwrap()), Some(mid));
            assert_eq!(lp.next(lp.first().unwrap()), Some(mid));
        }
    }

    #[test]
    fn backlen_round_trip() {
        for l in [0usize, 1, 127, 128, 16382, 16383, 2097150, 2097151, 268435455] {
            let mut buf = Vec::new();
            encode_backlen(l, &mut buf);
            assert_eq!(buf.len(), backlen_size(l));
            assert_eq!(decode_backlen(&buf, buf.len() - 1), Some((l, buf.len())));
        }
    }

    #[test]
    fn seek_both_directions() {
        let mut lp = ListPack::new();
        for i in 0..100 {
            lp.append(format!("v{i}").as_bytes()).unwrap();
        }
        for i in 0..100i64 {
            let pos = lp.seek(i).unwrap();
            assert_eq!(lp.get(pos).unwrap().to_vec(), format!("v{i}").into_bytes());
            assert_eq!(lp.seek(i - 100), Some(pos));
        }
        assert_eq!(lp.seek(100), None);
        assert_eq!(lp.seek(-101), None);

        let mut backward = Vec::new();
        let mut pos = lp.last();
        while let Some(p) = pos {
            backward.push(lp.get(p).unwrap().to_vec());
            pos = lp.prev(p);
        }
        backward.reverse();
        assert_eq!(backward, values(&lp));
    }

    #[test]
    fn insert_replace_delete() {
        let mut lp = create();
        let foo = lp.seek(1).unwrap();
        let new = lp.insert(foo, b"before-foo", LpWhere::Before).unwrap();
        assert_eq!(lp.get(new), Some(LpValue::Str(b"before-foo")));
        let foo = lp.next(new).unwrap();
        lp.insert(foo, b"-5", LpWhere::After).unwrap();
        assert_eq!(
            values(&lp),
            vec![
                b"hello".to_vec(),
                b"before-foo".to_vec(),
                b"foo".to_vec(),
                b"-5".to_vec(),
                b"quux".to_vec(),
                b"1024".to_vec()
            ]
        );

        let pos = lp.seek(2).unwrap();
        lp.replace(pos, b"a much longer replacement value for foo").unwrap();
        lp.replace(lp.seek(0).unwrap(), b"h").unwrap();
        lp.validate_integrity(true).unwrap();
        assert_eq!(lp.length(), 6);
        assert!(lp.compare(lp.seek(2).unwrap(), b"a much longer replacement value for foo"));
        assert!(lp.compare(lp.seek(0).unwrap(), b"h"));

        let next = lp.delete(lp.seek(2).unwrap()).unwrap();
        assert!(lp.compare(next.unwrap(), b"-5"));
        let last = lp.last().unwrap();
        assert_eq!(lp.delete(last).unwrap(), None);
        assert_eq!(lp.length(), 4);
        lp.validate_integrity(true).unwrap();

        assert_eq!(
            lp.insert(lp.bytes() - 1, b"x", LpWhere::After),
            Err(ListPackError::OutOfRange(lp.bytes() - 1))
        );
    }

    #[test]
    fn delete_range_truncates() {
        let mut lp = ListPack::new();
        for i in 0..10 {
            lp.append(i.to_string().as_bytes()).unwrap();
        }
        assert_eq!(lp.delete_range(2, 3).unwrap(), 3);
        assert_eq!(
            lp.iter().collect::<Vec<_>>(),
            [0, 1, 5, 6, 7, 8, 9].map(LpValue::Int).to_vec()
        );
        assert_eq!(lp.delete_range(-2, 10).unwrap(), 2);
        assert_eq!(lp.delete_range(7, 1).unwrap(), 0);
        assert_eq!(lp.length(), 5);
        lp.validate_integrity(true).unwrap();
    }

    #[test]
    fn merge_two_listpacks() {
        let mut a = create();
        let mut b = ListPack::new();
        b.append(b"x").unwrap();
        b.append(b"99").unwrap();
        let expect_bytes = a.bytes() + b.bytes() - LP_HDR_SIZE - 1;
        a.merge(&b).unwrap();
        assert_eq!(a.bytes(), expect_bytes);
        assert_eq!(a.length(), 6);
        a.validate_integrity(true).unwrap();
        assert_eq!(a.get(a.last().unwrap()), Some(LpValue::Int(99)));

        b = ListPack::new();
        a.merge(&b).unwrap();
        assert_eq!(a.length(), 6);
    }

    #[test]
    fn from_vec_rejects_corruption() {
        let lp = create();
        let good = lp.clone().into_vec();
        assert_eq!(ListPack::from_vec(good.clone()).unwrap(), lp);

        let mut truncated = good.clone();
        truncated.truncate(good.len() - 1);
        assert!(ListPack::from_vec(truncated).is_err());

        let mut bad_count = good.clone();
        bad_count[4] = 9;
        assert!(ListPack::from_vec(bad_count).is_err());

        // the backlen of the first entry ("hello": 6 bytes of data)
        let mut bad_backlen = good.clone();
        bad_backlen[LP_HDR_SIZE + 6] = 3;
        assert!(ListPack::from_vec(bad_backlen).is_err());

        assert!(ListPack::from_vec(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn random_push_pop_stress() {
        let mut rng = rand::rng();
        let mut lp = ListPack::new();
        let mut model: std::collections::VecDeque<Vec<u8>> = Default::default();
        for _ in 0..2000 {
            let len = rng.random_range(0..80);
            let value = if rng.random_bool(0.3) {
                rng.random::<i64>().to_string().into_bytes()
            } else {
                rand_bytes(len)
            };
            match rng.random_range(0..4) {
                0 => {
                    lp.prepend(&value).unwrap();
                    model.push_front(value);
                }
                1 => {
                    lp.append(&value).unwrap();
                    model.push_back(value);
                }
                2 => {
                    if let Some(pos) = lp.first() {
                        lp.delete(pos).unwrap();
                        model.pop_front();
                    }
                }
                _ => {
                    if let Some(pos) = lp.last() {
                        lp.delete(pos).unwrap();
                        model.pop_back();
                    }
                }
            }
        }
        lp.validate_integrity(true).unwrap();
        assert_eq!(values(&lp), model.into_iter().collect::<Vec<_>>());
    }
}
