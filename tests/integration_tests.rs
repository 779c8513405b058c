// Integration tests for Ember Match: memory backend + event bus + engines

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ember_match::core::events::{Event, EventBus, EventHandler};
use ember_match::core::{DiscoverError, DiscoveryEngine, SwipeError, SwipeMatcher, MATCH_CREATED_TOPIC};
use ember_match::models::{SwipePayload, User, UserFilter};
use ember_match::storage::{MatchStore, MemoryStore, SwipeStore, UserStore};

struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl EventHandler for CountingHandler {
    async fn handle(&self, _event: Event) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn dob_years_ago(years: u32) -> chrono::NaiveDate {
    Utc::now().date_naive() - chrono::Duration::days(i64::from(years) * 365 + 180)
}

fn test_user(id: &str, lat: f64, lon: f64, age: u32) -> User {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": format!("User {id}"),
        "email": format!("{id}@example.com"),
        "dateOfBirth": dob_years_ago(age).to_string(),
        "location": {"latitude": lat, "longitude": lon},
        "heightCm": 170.0,
        "gender": "female",
        "ethnicity": "white",
        "pets": "dog",
        "religion": "christian",
        "drinking": "no",
        "smoking": "no",
        "datingIntentions": "life partner",
        "attractiveness": 8
    }))
    .unwrap()
}

struct Harness {
    store: Arc<MemoryStore>,
    matcher: SwipeMatcher,
    discovery: DiscoveryEngine,
    match_events: Arc<AtomicUsize>,
}

async fn harness(users: &[User]) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let user_store: &dyn UserStore = store.as_ref();
    for user in users {
        user_store.create(user.clone()).await.unwrap();
    }

    let match_events = Arc::new(AtomicUsize::new(0));
    let mut bus = EventBus::new();
    bus.subscribe(
        MATCH_CREATED_TOPIC,
        Arc::new(CountingHandler {
            calls: Arc::clone(&match_events),
        }),
    )
    .unwrap();
    let running = bus.start();
    let publisher = running.publisher();
    std::mem::forget(running);

    let matcher = SwipeMatcher::new(
        Arc::clone(&store) as Arc<dyn UserStore>,
        Arc::clone(&store) as Arc<dyn SwipeStore>,
        Arc::clone(&store) as Arc<dyn MatchStore>,
        publisher,
    );
    let discovery = DiscoveryEngine::new(Arc::clone(&store) as Arc<dyn UserStore>);

    Harness {
        store,
        matcher,
        discovery,
        match_events,
    }
}

fn interested(prospect: &str) -> SwipePayload {
    SwipePayload {
        prospect_id: prospect.to_string(),
        interested: true,
    }
}

#[tokio::test]
async fn test_reciprocal_swipes_create_exactly_one_match() {
    let h = harness(&[
        test_user("alice", 51.60, 0.00, 28),
        test_user("bob", 51.61, 0.01, 30),
    ])
    .await;

    let first = h.matcher.swipe("alice", &interested("bob")).await.unwrap();
    assert!(!first.matched);
    assert!(first.match_id.is_none());

    let second = h.matcher.swipe("bob", &interested("alice")).await.unwrap();
    assert!(second.matched);
    let match_id = second.match_id.expect("match id");

    let stored = h
        .store
        .get_by_profile_pair("alice", "bob")
        .await
        .unwrap()
        .expect("one match persisted");
    assert_eq!(stored.id, match_id);
    assert!(stored.matched);

    // Exactly one match in either listing
    assert_eq!(h.store.list_for_user("alice").await.unwrap().len(), 1);
    assert_eq!(h.store.list_for_user("bob").await.unwrap().len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.match_events.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reciprocity_holds_in_the_other_arrival_order() {
    let h = harness(&[
        test_user("alice", 51.60, 0.00, 28),
        test_user("bob", 51.61, 0.01, 30),
    ])
    .await;

    h.matcher.swipe("bob", &interested("alice")).await.unwrap();
    let response = h.matcher.swipe("alice", &interested("bob")).await.unwrap();
    assert!(response.matched);
    assert!(response.match_id.is_some());
}

#[tokio::test]
async fn test_duplicate_swipe_creates_no_second_record() {
    let h = harness(&[
        test_user("alice", 51.60, 0.00, 28),
        test_user("bob", 51.61, 0.01, 30),
    ])
    .await;

    h.matcher.swipe("alice", &interested("bob")).await.unwrap();
    let err = h
        .matcher
        .swipe("alice", &interested("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, SwipeError::DuplicateSwipe));

    let swipe_store: &dyn SwipeStore = h.store.as_ref();
    let recorded = swipe_store
        .get_by_actor_and_target("alice", "bob")
        .await
        .unwrap();
    assert!(recorded.is_some());
}

#[tokio::test]
async fn test_discover_excludes_swiped_and_self() {
    let viewer = test_user("viewer", 51.60, 0.00, 30);
    let h = harness(&[
        viewer.clone(),
        test_user("swiped", 51.61, 0.01, 28),
        test_user("unseen", 51.62, 0.02, 28),
    ])
    .await;

    h.matcher
        .swipe("viewer", &interested("swiped"))
        .await
        .unwrap();

    let candidates = h
        .discovery
        .discover(&viewer, &UserFilter::default())
        .await
        .unwrap();

    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["unseen"]);
}

#[tokio::test]
async fn test_discover_age_window_keeps_only_in_range() {
    let viewer = test_user("viewer", 51.60, 0.00, 30);
    let h = harness(&[
        viewer.clone(),
        test_user("age20", 51.61, 0.01, 20),
        test_user("age30", 51.61, 0.02, 30),
        test_user("age40", 51.61, 0.03, 40),
    ])
    .await;

    let filter = UserFilter {
        min_age: Some(25),
        max_age: Some(35),
        ..Default::default()
    };
    let candidates = h.discovery.discover(&viewer, &filter).await.unwrap();

    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["age30"]);
    assert_eq!(candidates[0].age, 30);
}

#[tokio::test]
async fn test_discover_orders_nearest_first_and_annotates_distance() {
    let viewer = test_user("viewer", 51.60, 0.00, 30);
    let h = harness(&[
        viewer.clone(),
        test_user("far", 51.66, 0.08, 28),
        test_user("near", 51.601, 0.001, 28),
        test_user("mid", 51.62, 0.03, 28),
    ])
    .await;

    let candidates = h
        .discovery
        .discover(&viewer, &UserFilter::default())
        .await
        .unwrap();

    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid", "far"]);
    assert!(candidates[0].distance_km < candidates[1].distance_km);
    assert!(candidates[1].distance_km < candidates[2].distance_km);
}

#[tokio::test]
async fn test_discover_empty_result_is_success() {
    let viewer = test_user("viewer", 51.60, 0.00, 30);
    let h = harness(&[viewer.clone()]).await;

    let candidates = h
        .discovery
        .discover(&viewer, &UserFilter::default())
        .await
        .unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_discover_invalid_filter_fails_fast() {
    let viewer = test_user("viewer", 51.60, 0.00, 30);
    let h = harness(&[viewer.clone()]).await;

    let filter = UserFilter {
        min_age: Some(40),
        max_age: Some(20),
        ..Default::default()
    };
    let err = h.discovery.discover(&viewer, &filter).await.unwrap_err();
    assert!(matches!(err, DiscoverError::InvalidFilter(_)));
}

#[tokio::test]
async fn test_bus_duplicate_subscription_keeps_first_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut bus = EventBus::new();
    bus.subscribe(
        "topic",
        Arc::new(CountingHandler {
            calls: Arc::clone(&calls),
        }),
    )
    .unwrap();

    let other = Arc::new(CountingHandler {
        calls: Arc::new(AtomicUsize::new(0)),
    });
    assert!(bus.subscribe("topic", other).is_err());

    let running = bus.start();
    running
        .publisher()
        .publish("topic", serde_json::json!({}))
        .await
        .unwrap();
    running.shutdown().await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_publish_without_subscriber_neither_errors_nor_blocks() {
    let bus = EventBus::new();
    let running = bus.start();

    for _ in 0..20 {
        let publisher = running.publisher();
        let publish = publisher.publish("unsubscribed", serde_json::json!({}));
        tokio::time::timeout(Duration::from_secs(1), publish)
            .await
            .expect("publish must not block")
            .unwrap();
    }

    running.shutdown().await;
}
