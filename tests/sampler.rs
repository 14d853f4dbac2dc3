#![allow(non_snake_case)]

use enterprise_sync::{
    gateway::MintStats,
    loadable::Loadable,
    sampler::{
        NO_OPPONENTS_NOTICE,
        SamplerState,
    },
    search::QueryKind,
    test_helpers::*,
    types::{
        Address,
        EnterpriseId,
    },
};
use proptest::prelude::*;

/// Half of the id space is burned and one live id belongs to Alice.
fn mostly_burned() -> TestWorld {
    TestWorld::new()
        .burned(0, "Ash")
        .enterprise(1, "Mine", ALICE, 10)
        .burned(2, "Cinder")
        .enterprise(3, "Target", BOB, 30)
        .burned(4, "Soot")
        .enterprise(5, "Other", CAROL, 50)
}

#[tokio::test]
async fn random_opponent__skips_burned_and_own_candidates() {
    // given
    let (mut session, _chain) = mostly_burned().session_for(ALICE);

    // when
    let opponent = session.random_opponent().await.unwrap().unwrap();

    // then
    let detail = opponent.detail.as_ref().unwrap();
    assert!(!detail.burned);
    assert_ne!(detail.owner, ALICE);
    assert!([EnterpriseId(3), EnterpriseId(5)].contains(&opponent.id()));
    assert_eq!(session.search_state().kind(), &QueryKind::Random);
    assert_eq!(session.search_state().selected(), Some(opponent.id()));
    assert_eq!(
        session.sampler_state(),
        SamplerState::Chosen { id: opponent.id() }
    );
}

#[tokio::test]
async fn random_opponent__draws_from_the_free_mint_range() {
    // given
    let world = TestWorld::new()
        .burned(0, "Ash")
        .enterprise(10, "Free", BOB, 5)
        .mint_stats(MintStats {
            auction_count: 1,
            free_count: 1,
            max_auctioned: 10,
        });
    let (mut session, _chain) = world.session_for(ALICE);

    // when
    let opponent = session.random_opponent().await.unwrap();

    // then
    assert_eq!(opponent.map(|e| e.id()), Some(EnterpriseId(10)));
}

#[tokio::test]
async fn random_opponent__empty_id_space_notifies_once() {
    // given
    let (mut session, _chain) = TestWorld::new().session_for(ALICE);

    // when
    let opponent = session.random_opponent().await.unwrap();
    session.settle().await.unwrap();

    // then
    assert!(opponent.is_none());
    assert_eq!(session.sampler_state(), SamplerState::Exhausted);
    assert_eq!(session.notices().count_matching(NO_OPPONENTS_NOTICE), 1);
}

#[tokio::test]
async fn random_opponent__each_request_on_empty_id_space_notifies_and_resolves_empty() {
    // given
    let (mut session, _chain) = TestWorld::new().session_for(ALICE);
    session.random_opponent().await.unwrap();

    // when
    let again = session.random_opponent().await.unwrap();

    // then
    assert!(again.is_none());
    assert_eq!(session.sampler_state(), SamplerState::Exhausted);
    assert_eq!(session.search_state().status(), &Loadable::Ready(0));
    assert_eq!(session.notices().count_matching(NO_OPPONENTS_NOTICE), 2);
}

#[tokio::test]
async fn search__replacing_a_random_search_resets_the_sampler() {
    let (mut session, _chain) = mostly_burned().session_for(ALICE);
    session.random_opponent().await.unwrap();

    session.search("3");

    assert_eq!(session.sampler_state(), SamplerState::Idle);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_opponent__never_publishes_a_burned_enterprise(
        seed in any::<u64>(),
        burned in proptest::collection::vec(any::<bool>(), 1..8),
    ) {
        // at least one live enterprise so the draw terminates
        let world = burned
            .iter()
            .enumerate()
            .fold(TestWorld::new(), |world, (id, &burned)| {
                if burned {
                    world.burned(id as u64, "Burned")
                } else {
                    world.enterprise(id as u64, "Live", BOB, 1)
                }
            })
            .enterprise(burned.len() as u64, "Last", BOB, 1)
            .engine_config(|config| {
                config.sampler_seed = Some(seed);
                config.max_settle_rounds = 512;
            });
        let (mut session, _chain) = world.session_for(ALICE);

        let published = futures::executor::block_on(session.random_opponent());

        let published = published.unwrap().unwrap();
        prop_assert_eq!(published.burned(), Some(false));
        prop_assert_ne!(published.detail.as_ref().map(|d| d.owner), Some(Address::EMPTY));
        prop_assert!(matches!(session.search_state().status(), Loadable::Ready(1)));
    }
}
