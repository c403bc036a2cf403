use rusqlite::Connection;
use tagledger_core::db::open_db_in_memory;
use tagledger_core::{
    Account, ItemId, MemoryOwnershipOracle, MemoryRoleAuthority, RegistryConfig, RoleAuthority,
    SqliteRegistryStore, TagId, TagRegistry,
};

type Registry<'conn> =
    TagRegistry<SqliteRegistryStore<'conn>, MemoryOwnershipOracle, MemoryRoleAuthority>;

fn account(n: u8) -> Account {
    Account::parse(&format!("0x{n:040x}")).expect("test account should parse")
}

fn admin() -> Account {
    account(1)
}

fn registry_with_config<'c>(
    conn: &'c mut Connection,
    tag: TagId,
    tagger: &Account,
    config: RegistryConfig,
) -> Registry<'c> {
    let store = SqliteRegistryStore::try_new(conn).expect("store over migrated connection");
    let mut authority = MemoryRoleAuthority::with_root(admin());
    authority
        .grant_role(&admin(), tag, tagger)
        .expect("root grant to tagger");
    TagRegistry::with_config(store, MemoryOwnershipOracle::new(), authority, config)
}

fn registry<'c>(conn: &'c mut Connection, tag: TagId, tagger: &Account) -> Registry<'c> {
    registry_with_config(conn, tag, tagger, RegistryConfig::default())
}

#[test]
fn first_tagged_item_becomes_owner_representative() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let owner = account(3);
    let mut reg = registry(&mut conn, tag, &tagger);
    reg.oracle_mut().mint(ItemId::new(10), owner.clone()).unwrap();

    reg.add_tag(&tagger, ItemId::new(10), tag).unwrap();

    assert!(reg.has_tag(&owner, tag).unwrap());
}

#[test]
fn later_tagged_items_do_not_overwrite_representative() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let owner = account(3);
    let mut reg = registry(&mut conn, tag, &tagger);
    reg.oracle_mut().mint(ItemId::new(10), owner.clone()).unwrap();
    reg.oracle_mut().mint(ItemId::new(11), owner.clone()).unwrap();

    reg.add_tag(&tagger, ItemId::new(10), tag).unwrap();
    reg.add_tag(&tagger, ItemId::new(11), tag).unwrap();

    // The representative is still item 10: untag it and the account-level
    // query goes false even though item 11 remains tagged.
    reg.remove_tag(&tagger, ItemId::new(10), tag).unwrap();
    assert!(!reg.has_tag(&owner, tag).unwrap());
    assert!(reg.item_has_tag(ItemId::new(11), tag).unwrap());
}

#[test]
fn self_service_set_default_overrides_existing_entry() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let owner = account(3);
    let mut reg = registry(&mut conn, tag, &tagger);
    reg.oracle_mut().mint(ItemId::new(10), owner.clone()).unwrap();
    reg.oracle_mut().mint(ItemId::new(11), owner.clone()).unwrap();

    reg.add_tag(&tagger, ItemId::new(10), tag).unwrap();
    reg.add_tag(&tagger, ItemId::new(11), tag).unwrap();
    reg.set_default(&owner, ItemId::new(11)).unwrap();
    reg.remove_tag(&tagger, ItemId::new(10), tag).unwrap();

    // Representative is now item 11, which still carries the tag.
    assert!(reg.has_tag(&owner, tag).unwrap());
}

#[test]
fn auto_default_disabled_assigns_no_representative() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let owner = account(3);
    let mut reg = registry_with_config(
        &mut conn,
        tag,
        &tagger,
        RegistryConfig {
            auto_default: false,
        },
    );
    reg.oracle_mut().mint(ItemId::new(10), owner.clone()).unwrap();

    reg.add_tag(&tagger, ItemId::new(10), tag).unwrap();

    assert!(reg.item_has_tag(ItemId::new(10), tag).unwrap());
    assert!(!reg.has_tag(&owner, tag).unwrap());

    // The self-service path still works with the policy disabled.
    reg.set_default(&owner, ItemId::new(10)).unwrap();
    assert!(reg.has_tag(&owner, tag).unwrap());
}

#[test]
fn has_tag_is_false_for_accounts_without_representative() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let reg = registry(&mut conn, tag, &tagger);

    assert!(!reg.has_tag(&account(8), tag).unwrap());
}

#[test]
fn has_tag_is_false_for_stale_representative_after_transfer() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let owner = account(3);
    let buyer = account(4);
    let mut reg = registry(&mut conn, tag, &tagger);
    reg.oracle_mut().mint(ItemId::new(10), owner.clone()).unwrap();

    reg.add_tag(&tagger, ItemId::new(10), tag).unwrap();
    assert!(reg.has_tag(&owner, tag).unwrap());

    reg.oracle_mut()
        .transfer(ItemId::new(10), buyer.clone())
        .unwrap();

    // The item still carries the tag, but the stale representative no
    // longer counts for the original owner, and the buyer has no
    // representative entry of their own.
    assert!(reg.item_has_tag(ItemId::new(10), tag).unwrap());
    assert!(!reg.has_tag(&owner, tag).unwrap());
    assert!(!reg.has_tag(&buyer, tag).unwrap());
}

#[test]
fn item_zero_is_a_first_class_representative() {
    let mut conn = open_db_in_memory().unwrap();
    let tag = TagId::from_label("verified");
    let tagger = account(2);
    let owner = account(3);
    let mut reg = registry(&mut conn, tag, &tagger);
    reg.oracle_mut().mint(ItemId::new(0), owner.clone()).unwrap();
    reg.oracle_mut().mint(ItemId::new(1), owner.clone()).unwrap();

    reg.add_tag(&tagger, ItemId::new(0), tag).unwrap();
    assert!(reg.has_tag(&owner, tag).unwrap());

    // Item 0 occupies the representative slot like any other id; a later
    // add does not steal it.
    reg.add_tag(&tagger, ItemId::new(1), tag).unwrap();
    reg.remove_tag(&tagger, ItemId::new(0), tag).unwrap();
    assert!(!reg.has_tag(&owner, tag).unwrap());
}
