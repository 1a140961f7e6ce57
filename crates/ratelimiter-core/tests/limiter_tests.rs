use ratelimiter_core::shared::store::testing::FakeSharedStore;
use ratelimiter_core::{Decider, LocalTokenBucket, MultiDimension, SharedTokenBucket};
use std::sync::Arc;
use std::time::Duration;
use systems_common::ManualClock;

/// spec §8 scenario 5: capacity=5, rate=1/s, 5 rapid allows, 6th denied,
/// 1.0s later allowed again.
#[test]
fn local_token_bucket_scenario_5() {
    let clock = Arc::new(ManualClock::default());
    let bucket = LocalTokenBucket::new(5, 1.0, clock.clone());
    for _ in 0..5 {
        assert!(bucket.allow("player-1"));
    }
    assert!(!bucket.allow("player-1"));

    clock.advance(Duration::from_secs_f64(1.0));
    assert!(bucket.allow("player-1"));
}

#[tokio::test]
async fn shared_token_bucket_matches_local_semantics() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(FakeSharedStore::new());
    let bucket = SharedTokenBucket::new("dim", 5, 1.0, store, clock.clone());

    for _ in 0..5 {
        assert!(bucket.allow("player-1").await.unwrap());
    }
    assert!(!bucket.allow("player-1").await.unwrap());

    clock.advance(Duration::from_secs(1));
    assert!(bucket.allow("player-1").await.unwrap());
}

#[tokio::test]
async fn multi_dimension_denies_on_first_exhausted_dimension() {
    let clock = Arc::new(ManualClock::default());
    let per_ip = LocalTokenBucket::new(100, 100.0, clock.clone());
    let per_player = LocalTokenBucket::new(1, 1.0, clock.clone());

    // exhaust per_player before composing, to isolate the deny source.
    assert!(per_player.allow("p1"));

    struct Named<C: systems_common::Clock>(LocalTokenBucket<C>, &'static str);
    #[async_trait::async_trait]
    impl<C: systems_common::Clock> Decider for Named<C> {
        fn name(&self) -> &str {
            self.1
        }
        async fn allow(&self, key: &str) -> ratelimiter_core::Result<bool> {
            Ok(self.0.allow(key))
        }
    }

    let dims: Vec<Box<dyn Decider>> = vec![
        Box::new(Named(per_ip, "per_ip")),
        Box::new(Named(per_player, "per_player")),
    ];
    let multi = MultiDimension::new(dims);
    let verdict = multi.evaluate("p1").await;
    assert_eq!(verdict.unwrap().dimension, "per_player");
}

#[tokio::test]
async fn multi_dimension_fails_open_on_decider_error() {
    struct AlwaysErrors;
    #[async_trait::async_trait]
    impl Decider for AlwaysErrors {
        fn name(&self) -> &str {
            "broken"
        }
        async fn allow(&self, _key: &str) -> ratelimiter_core::Result<bool> {
            Err(ratelimiter_core::LimiterError::StoreUnavailable("down".into()))
        }
    }

    let multi = MultiDimension::new(vec![Box::new(AlwaysErrors)]);
    let verdict = multi.evaluate("any-key").await;
    assert!(verdict.is_none(), "a failing dimension must fail open, not deny");
}

#[tokio::test]
async fn multi_dimension_fails_open_on_timeout() {
    struct NeverReturns;
    #[async_trait::async_trait]
    impl Decider for NeverReturns {
        fn name(&self) -> &str {
            "slow"
        }
        async fn allow(&self, _key: &str) -> ratelimiter_core::Result<bool> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        }
    }

    let multi = MultiDimension::new(vec![Box::new(NeverReturns)]).with_timeout(Duration::from_millis(10));
    let verdict = multi.evaluate("any-key").await;
    assert!(verdict.is_none());
}
