use rusqlite::Connection;
use std::time::{SystemTime, UNIX_EPOCH};
use tagledger_core::db::open_db_in_memory;
use tagledger_core::{
    Account, ItemId, MemoryOwnershipOracle, MemoryRoleAuthority, RegistryError, RepoError,
    RoleAuthority, SqliteRegistryStore, TagEventKind, TagId, TagRegistry,
};

type Registry<'conn> =
    TagRegistry<SqliteRegistryStore<'conn>, MemoryOwnershipOracle, MemoryRoleAuthority>;

fn account(n: u8) -> Account {
    Account::parse(&format!("0x{n:040x}")).expect("test account should parse")
}

fn admin() -> Account {
    account(1)
}

fn registry_with_tagger<'c>(conn: &'c mut Connection, tag: TagId, tagger: &Account) -> Registry<'c> {
    let store = SqliteRegistryStore::try_new(conn).expect("store over migrated connection");
    let mut authority = MemoryRoleAuthority::with_root(admin());
    authority
        .grant_role(&admin(), tag, tagger)
        .expect("root grant to tagger");
    TagRegistry::new(store, MemoryOwnershipOracle::new(), authority)
}

#[test]
fn add_tag_sets_membership_and_increments_count() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);
    registry
        .oracle_mut()
        .mint(ItemId::new(7), account(3))
        .unwrap();

    registry.add_tag(&tagger, ItemId::new(7), tag).unwrap();

    assert!(registry.item_has_tag(ItemId::new(7), tag).unwrap());
    assert_eq!(registry.total_tag_havers(tag).unwrap(), 1);
}

#[test]
fn duplicate_add_fails_with_counts_unchanged() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);
    registry
        .oracle_mut()
        .mint(ItemId::new(7), account(3))
        .unwrap();

    registry.add_tag(&tagger, ItemId::new(7), tag).unwrap();
    let err = registry
        .add_tag(&tagger, ItemId::new(7), tag)
        .expect_err("second add must fail");

    assert!(matches!(err, RegistryError::AlreadyTagged { .. }));
    assert_eq!(registry.total_tag_havers(tag).unwrap(), 1);
}

#[test]
fn remove_tag_on_untagged_pair_fails_not_tagged() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);
    registry
        .oracle_mut()
        .mint(ItemId::new(7), account(3))
        .unwrap();

    let err = registry
        .remove_tag(&tagger, ItemId::new(7), tag)
        .expect_err("remove on untagged pair must fail");

    assert!(matches!(err, RegistryError::NotTagged { .. }));
    assert_eq!(registry.total_tag_havers(tag).unwrap(), 0);
}

#[test]
fn remove_tag_clears_membership_and_decrements_count() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);
    registry
        .oracle_mut()
        .mint(ItemId::new(7), account(3))
        .unwrap();

    registry.add_tag(&tagger, ItemId::new(7), tag).unwrap();
    registry.remove_tag(&tagger, ItemId::new(7), tag).unwrap();

    assert!(!registry.item_has_tag(ItemId::new(7), tag).unwrap());
    assert_eq!(registry.total_tag_havers(tag).unwrap(), 0);
}

#[test]
fn count_equals_membership_after_operation_sequence() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);

    for id in 0..6u64 {
        registry
            .oracle_mut()
            .mint(ItemId::new(id), account(3))
            .unwrap();
        registry.add_tag(&tagger, ItemId::new(id), tag).unwrap();
    }
    registry.remove_tag(&tagger, ItemId::new(1), tag).unwrap();
    registry.remove_tag(&tagger, ItemId::new(4), tag).unwrap();
    registry.add_tag(&tagger, ItemId::new(1), tag).unwrap();

    let tagged = (0..6u64)
        .filter(|id| registry.item_has_tag(ItemId::new(*id), tag).unwrap())
        .count() as u64;
    assert_eq!(registry.total_tag_havers(tag).unwrap(), tagged);
    assert_eq!(tagged, 5);
}

#[test]
fn unauthorized_mutations_fail_and_leave_state_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let stranger = account(9);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);
    registry
        .oracle_mut()
        .mint(ItemId::new(7), account(3))
        .unwrap();

    let err = registry
        .add_tag(&stranger, ItemId::new(7), tag)
        .expect_err("roleless add must fail");
    assert!(matches!(err, RegistryError::Unauthorized { .. }));
    assert!(!registry.item_has_tag(ItemId::new(7), tag).unwrap());
    assert_eq!(registry.total_tag_havers(tag).unwrap(), 0);

    registry.add_tag(&tagger, ItemId::new(7), tag).unwrap();
    let err = registry
        .remove_tag(&stranger, ItemId::new(7), tag)
        .expect_err("roleless remove must fail");
    assert!(matches!(err, RegistryError::Unauthorized { .. }));
    assert!(registry.item_has_tag(ItemId::new(7), tag).unwrap());
    assert_eq!(registry.total_tag_havers(tag).unwrap(), 1);
}

#[test]
fn add_tag_on_nonexistent_item_fails_item_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);

    let err = registry
        .add_tag(&tagger, ItemId::new(404), tag)
        .expect_err("add on unminted item must fail");

    assert!(matches!(err, RegistryError::ItemNotFound(item) if item == ItemId::new(404)));
    assert_eq!(registry.total_tag_havers(tag).unwrap(), 0);
}

#[test]
fn event_feed_records_every_mutation_in_order() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);
    registry
        .oracle_mut()
        .mint(ItemId::new(7), account(3))
        .unwrap();

    registry.add_tag(&tagger, ItemId::new(7), tag).unwrap();
    registry.remove_tag(&tagger, ItemId::new(7), tag).unwrap();
    registry.add_tag(&tagger, ItemId::new(7), tag).unwrap();

    let events = registry.events_since(0).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![
            TagEventKind::TagAdded,
            TagEventKind::TagRemoved,
            TagEventKind::TagAdded,
        ]
    );
    assert!(events.windows(2).all(|pair| pair[0].seq < pair[1].seq));
    assert!(events.iter().all(|e| e.tag == tag && e.item == ItemId::new(7)));

    // Failed mutations append nothing.
    let last_seq = events.last().unwrap().seq;
    let _ = registry.add_tag(&tagger, ItemId::new(7), tag).unwrap_err();
    assert!(registry.events_since(last_seq).unwrap().is_empty());
}

#[test]
fn event_timestamps_are_epoch_milliseconds() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let mut registry = registry_with_tagger(&mut conn, tag, &tagger);
    registry
        .oracle_mut()
        .mint(ItemId::new(7), account(3))
        .unwrap();

    let before_ms = epoch_ms();
    registry.add_tag(&tagger, ItemId::new(7), tag).unwrap();
    let after_ms = epoch_ms();

    let events = registry.events_since(0).unwrap();
    assert_eq!(events.len(), 1);
    assert!(
        before_ms <= events[0].at_ms && events[0].at_ms <= after_ms,
        "at_ms {} outside wall-clock window [{before_ms}, {after_ms}]",
        events[0].at_ms
    );
}

#[test]
fn store_over_unmigrated_connection_reports_missing_schema() {
    let mut conn = Connection::open_in_memory().unwrap();

    let err = SqliteRegistryStore::try_new(&mut conn)
        .err()
        .expect("store over a raw connection must fail");

    assert!(matches!(err, RepoError::SchemaMissing));
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_millis() as i64
}
