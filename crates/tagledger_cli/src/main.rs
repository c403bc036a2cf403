//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tagledger_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use tagledger_core::db::open_db_in_memory;
use tagledger_core::{
    Account, ItemId, MemoryOwnershipOracle, MemoryRoleAuthority, RoleAuthority,
    SqliteRegistryStore, TagId, TagRegistry,
};

fn main() {
    println!("tagledger_core version={}", tagledger_core::core_version());

    let admin = Account::parse("0x0000000000000000000000000000000000000001").expect("admin");
    let alice = Account::parse("0x0000000000000000000000000000000000000002").expect("alice");
    let verified = TagId::from_label("verified");
    let item = ItemId::new(7);

    let mut conn = open_db_in_memory().expect("in-memory db");
    let store = SqliteRegistryStore::try_new(&mut conn).expect("store");
    let mut oracle = MemoryOwnershipOracle::new();
    oracle.mint(item, alice.clone()).expect("mint");
    let mut authority = MemoryRoleAuthority::with_root(admin.clone());
    authority
        .grant_role(&admin, verified, &admin)
        .expect("grant");

    let mut registry = TagRegistry::new(store, oracle, authority);
    registry.add_tag(&admin, item, verified).expect("add tag");

    println!(
        "smoke item_has_tag={} has_tag={} total={}",
        registry.item_has_tag(item, verified).expect("item query"),
        registry.has_tag(&alice, verified).expect("account query"),
        registry.total_tag_havers(verified).expect("count query"),
    );
}
