#![allow(non_snake_case)]

use enterprise_sync::{
    cache::CallCache,
    enterprise::{
        Enterprise,
        EnterpriseRegistry,
        Resolver,
    },
    gateway::{
        ChainGateway,
        in_memory::InMemoryChain,
    },
    loadable::Loadable,
    pagination::{
        IndexedSlots,
        LoadRequest,
        Slot,
        load,
    },
    test_helpers::*,
    types::EnterpriseId,
};
use proptest::prelude::*;
use std::sync::Arc;

/// Runs `pass` and answers its reads until it stops asking for any.
async fn drive(
    chain: &InMemoryChain,
    cache: &mut CallCache,
    mut pass: impl FnMut(&CallCache) -> Loadable<usize>,
) -> Loadable<usize> {
    loop {
        let status = pass(cache);
        let (calls, epoch) = cache.take_pending();
        if calls.is_empty() {
            return status;
        }
        for call in calls {
            let result = chain.read(&call).await;
            cache.complete(call, result, epoch);
        }
    }
}

fn world_with_holdings(owner_balance: u64) -> TestWorld {
    (0..owner_balance).fold(
        TestWorld::new().enterprise(100, "Elsewhere", BOB, 1),
        |world, id| world.enterprise(id, &format!("E{id}"), ALICE, 10 + id),
    )
}

async fn load_alice(
    world: &TestWorld,
    window: usize,
    force_basic_for_all: bool,
) -> (Loadable<usize>, IndexedSlots<Arc<Enterprise>>) {
    let chain = world.chain();
    let mut cache = CallCache::new();
    let mut registry = EnterpriseRegistry::new();
    let mut out = IndexedSlots::new();
    let request = LoadRequest {
        owner: ALICE,
        window,
        force_basic_for_all,
    };
    let status = drive(&chain, &mut cache, |cache| {
        let resolver = Resolver::new(cache, GENESIS.timestamp);
        load(&resolver, &mut registry, &request, &mut out)
    })
    .await;
    (status, out)
}

#[tokio::test]
async fn load__balance_three_window_one_forced__only_first_has_detail() {
    // given
    let world = world_with_holdings(3);

    // when
    let (status, out) = load_alice(&world, 1, true).await;

    // then
    assert_eq!(status, Loadable::Ready(3));
    assert_eq!(out.len(), 3);
    let detail: Vec<bool> = (0..3)
        .map(|index| out.ready(index).map(|e| e.has_detail()))
        .collect::<Option<_>>()
        .unwrap();
    assert_eq!(detail, vec![true, false, false]);
}

#[tokio::test]
async fn load__zero_balance_is_ready_and_empty() {
    // given
    let world = world_with_holdings(0);

    // when
    let (status, out) = load_alice(&world, 3, false).await;

    // then
    assert_eq!(status, Loadable::Ready(0));
    assert!(out.is_empty());
}

#[tokio::test]
async fn load__unforced_leaves_positions_past_the_window_loading() {
    let world = world_with_holdings(4);

    let (status, out) = load_alice(&world, 2, false).await;

    assert_eq!(status, Loadable::Ready(4));
    assert_eq!(out.len(), 4);
    assert!(out.ready(1).is_some_and(|e| e.has_detail()));
    assert_eq!(out.get(2), Some(&Slot::Loading));
    assert_eq!(out.get(3), Some(&Slot::Loading));
}

#[tokio::test]
async fn load__shrinking_balance_truncates_trailing_positions() {
    // given
    let world = world_with_holdings(3);
    let chain = world.chain();
    let mut cache = CallCache::new();
    let mut registry = EnterpriseRegistry::new();
    let mut out = IndexedSlots::new();
    let request = LoadRequest {
        owner: ALICE,
        window: 3,
        force_basic_for_all: false,
    };
    let mut pass = |cache: &CallCache, out: &mut IndexedSlots<Arc<Enterprise>>| {
        let resolver = Resolver::new(cache, GENESIS.timestamp);
        load(&resolver, &mut registry, &request, out)
    };
    drive(&chain, &mut cache, |cache| pass(cache, &mut out)).await;
    assert_eq!(out.len(), 3);

    // when
    chain.set_owner(EnterpriseId(2), CAROL);
    cache.advance_block(chain.advance_block(12));
    let status = drive(&chain, &mut cache, |cache| pass(cache, &mut out)).await;

    // then
    assert_eq!(status, Loadable::Ready(2));
    assert_eq!(out.ids().collect::<Vec<_>>(), vec![EnterpriseId(0), EnterpriseId(1)]);
}

proptest! {
    #[test]
    fn load__length_matches_balance_and_detail_stays_in_window(
        balance in 0u64..8,
        window in 0usize..10,
        force in any::<bool>(),
    ) {
        let world = world_with_holdings(balance);

        let (status, out) = futures::executor::block_on(load_alice(&world, window, force));

        let len = balance as usize;
        prop_assert_eq!(status, Loadable::Ready(len));
        prop_assert_eq!(out.len(), len);
        let effective = if force { len } else { len.min(window) };
        for index in 0..len {
            match out.ready(index) {
                Some(enterprise) => {
                    prop_assert!(index < effective);
                    prop_assert_eq!(enterprise.has_detail(), index < window);
                }
                None => prop_assert!(index >= effective),
            }
        }
    }
}
