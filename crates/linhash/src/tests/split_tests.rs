use super::helpers::{key, new_table, val};
use crate::{DictError, Dictionary, KeyType, LinearHashConfig, LinearHashTable, Predicate};
use anyhow::Result;
use tempfile::tempdir;

#[test]
fn threshold_formula_uses_total_capacity() -> Result<()> {
    let dir = tempdir()?;
    // 4 buckets * 4 slots = 16; 85% of 16 = 13.6, so the crossing insert
    // is the 14th.
    let mut table = new_table(dir.path());

    for n in 0..13 {
        table.insert(&key(n), &val(0))?;
    }
    assert_eq!(table.num_buckets(), 4, "13 records stay below threshold");
    assert_eq!(table.next_split(), 0);

    table.insert(&key(13), &val(0))?;
    assert_eq!(table.num_buckets(), 5, "14th record crosses and splits once");
    assert_eq!(table.next_split(), 1);
    Ok(())
}

#[test]
fn exactly_one_split_per_crossing() -> Result<()> {
    let dir = tempdir()?;
    let mut table = new_table(dir.path());

    let mut buckets_seen = vec![table.num_buckets()];
    for n in 0..40 {
        table.insert(&key(n), &val(i64::from(n)))?;
        buckets_seen.push(table.num_buckets());
    }

    // The bucket count only ever grows by 0 or 1 per insert.
    for pair in buckets_seen.windows(2) {
        assert!(pair[1] == pair[0] || pair[1] == pair[0] + 1);
    }
    assert!(
        *buckets_seen.last().unwrap() > 4,
        "40 inserts into 16 slots must have split"
    );
    Ok(())
}

#[test]
fn all_keys_remain_reachable_across_splits() -> Result<()> {
    let dir = tempdir()?;
    let mut table = new_table(dir.path());

    for n in 0..100 {
        table.insert(&key(n), &val(i64::from(n) * 3))?;
    }
    assert_eq!(table.num_records(), 100);
    for n in 0..100 {
        assert_eq!(table.get(&key(n))?, val(i64::from(n) * 3), "key {}", n);
    }
    Ok(())
}

#[test]
fn completed_round_doubles_generation_and_resets_pointer() -> Result<()> {
    let dir = tempdir()?;
    // 2 buckets * 2 slots, 50% threshold: inserts 3 and 4 each split, which
    // finishes the first growth round.
    let config = LinearHashConfig {
        initial_size: 2,
        records_per_bucket: 2,
        split_threshold: 50,
        ..LinearHashConfig::default()
    };
    let mut table = LinearHashTable::init(dir.path(), 1, config)?;

    for n in 0..4 {
        table.insert(&key(n), &val(i64::from(n)))?;
    }

    assert_eq!(table.initial_size(), 4, "generation doubled");
    assert_eq!(table.next_split(), 0, "split pointer reset");
    assert_eq!(table.num_buckets(), 4);
    for n in 0..4 {
        assert_eq!(table.get(&key(n))?, val(i64::from(n)));
    }
    Ok(())
}

#[test]
fn split_migrates_records_out_of_overflow_chains() -> Result<()> {
    let dir = tempdir()?;
    // Cram one bucket's chain, then push the load factor over the line and
    // check nothing is lost or duplicated.
    let mut table = new_table(dir.path());

    for n in 0..9 {
        table.insert(&key(n * 4), &val(i64::from(n)))?; // all bucket 0
    }
    for n in 0..5 {
        table.insert(&key(n * 4 + 1), &val(100 + i64::from(n)))?; // bucket 1
    }
    assert!(table.num_buckets() > 4, "load factor crossed, split ran");

    for n in 0..9 {
        assert_eq!(table.get(&key(n * 4))?, val(i64::from(n)));
    }
    for n in 0..5 {
        assert_eq!(table.get(&key(n * 4 + 1))?, val(100 + i64::from(n)));
    }
    assert_eq!(table.num_records(), 14, "split changes no record count");
    Ok(())
}

#[test]
fn split_drops_tombstones_from_record_list() -> Result<()> {
    let dir = tempdir()?;
    let mut table = new_table(dir.path());

    // Fill bucket 0 past its primary page, then delete some of it.
    for n in 0..8 {
        table.insert(&key(n * 4), &val(i64::from(n)))?;
    }
    for n in 0..4 {
        table.delete(&key(n * 4))?;
    }

    // Push over the threshold so bucket 0 eventually splits.
    let mut n = 0;
    while table.next_split() == 0 && table.initial_size() == 4 {
        table.insert(&key(n * 4 + 2), &val(0))?;
        n += 1;
    }

    for m in 4..8 {
        assert_eq!(table.get(&key(m * 4))?, val(i64::from(m)));
    }
    for m in 0..4 {
        assert!(matches!(
            table.get(&key(m * 4)),
            Err(DictError::ItemNotFound)
        ));
    }
    Ok(())
}

// The acceptance scenario: init(N=4, threshold=85%, cap=4); 20 distinct int
// keys force at least one split (20 / 16 = 125%); all 20 readable; delete
// 10; those 10 miss; an all-records cursor yields exactly the remaining 10.
#[test]
fn growth_scenario_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let mut table = new_table(dir.path());

    for n in 0..20 {
        table.insert(&key(n), &val(i64::from(n)))?;
    }
    assert!(table.num_buckets() > 4, "at least one split observed");
    for n in 0..20 {
        assert_eq!(table.get(&key(n))?, val(i64::from(n)));
    }

    for n in 0..10 {
        assert_eq!(table.delete(&key(n * 2))?, 1);
    }
    assert_eq!(table.num_records(), 10);
    for n in 0..10 {
        assert!(matches!(
            table.get(&key(n * 2)),
            Err(DictError::ItemNotFound)
        ));
    }

    let mut remaining = Vec::new();
    let mut cursor = table.find(Predicate::AllRecords)?;
    while let Some(record) = cursor.next()? {
        remaining.push(i32::from_le_bytes(record.key.as_slice().try_into()?));
    }
    remaining.sort_unstable();
    let expected: Vec<i32> = (0..10).map(|n| n * 2 + 1).collect();
    assert_eq!(remaining, expected, "each survivor yielded exactly once");
    Ok(())
}

#[test]
fn char_array_table_splits_too() -> Result<()> {
    let dir = tempdir()?;
    let config = LinearHashConfig {
        key_type: KeyType::CharArray,
        key_size: 4,
        value_size: 8,
        initial_size: 2,
        records_per_bucket: 2,
        split_threshold: 70,
    };
    let mut table = LinearHashTable::init(dir.path(), 1, config)?;

    let keys: Vec<[u8; 4]> = (0u16..24)
        .map(|n| {
            let [a, b] = n.to_le_bytes();
            [b'k', b'_', a, b]
        })
        .collect();
    for (n, k) in keys.iter().enumerate() {
        table.insert(k, &val(n as i64))?;
    }

    assert!(table.num_buckets() > 2);
    for (n, k) in keys.iter().enumerate() {
        assert_eq!(table.get(k)?, val(n as i64), "key {}", n);
    }
    Ok(())
}
