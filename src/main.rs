use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::{error, info};

use ember_match::config::{DatabaseBackend, Settings};
use ember_match::core::{DiscoveryEngine, EventBus, SwipeMatcher, MATCH_CREATED_TOPIC};
use ember_match::notify::MatchNotifier;
use ember_match::routes::{self, api::AppState};
use ember_match::seed;
use ember_match::storage::{
    CachedUsers, MatchStore, MemoryStore, PgStore, SwipeStore, UserStore,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.logging.level.clone()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Ember Match service...");

    // Select the storage backend configured for this deployment
    let (users, swipes, matches): (Arc<dyn UserStore>, Arc<dyn SwipeStore>, Arc<dyn MatchStore>) =
        match settings.database.backend {
            DatabaseBackend::Memory => {
                let store = Arc::new(MemoryStore::new());
                info!("In-memory storage backend initialized");

                match seed::seed_default_users(
                    store.as_ref() as &dyn UserStore,
                    settings.matching.seed_user_count,
                )
                .await
                {
                    Ok(inserted) if inserted > 0 => {
                        info!("Seeded {} profiles for development", inserted)
                    }
                    Ok(_) => {}
                    Err(e) => error!("Profile seeding failed: {}", e),
                }

                (
                    Arc::clone(&store) as Arc<dyn UserStore>,
                    Arc::clone(&store) as Arc<dyn SwipeStore>,
                    store as Arc<dyn MatchStore>,
                )
            }
            DatabaseBackend::Postgres => {
                let url = settings
                    .database
                    .url
                    .clone()
                    .expect("database.url is required for the postgres backend");
                let store = Arc::new(
                    PgStore::new(
                        &url,
                        settings.database.max_connections.unwrap_or(10),
                        settings.database.min_connections.unwrap_or(1),
                    )
                    .await
                    .unwrap_or_else(|e| {
                        error!("Failed to connect to PostgreSQL: {}", e);
                        panic!("PostgreSQL connection error: {}", e);
                    }),
                );
                info!("PostgreSQL storage backend initialized");

                (
                    Arc::clone(&store) as Arc<dyn UserStore>,
                    Arc::clone(&store) as Arc<dyn SwipeStore>,
                    store as Arc<dyn MatchStore>,
                )
            }
        };

    // Profile lookups go through the in-process cache tier
    let users: Arc<dyn UserStore> = Arc::new(CachedUsers::new(
        users,
        settings.matching.profile_cache_size,
        settings.matching.profile_cache_ttl_secs,
    ));

    // Wire the event bus: subscriptions first, then start the dispatcher
    let mut bus = EventBus::with_capacity(settings.bus.capacity);
    bus.subscribe(MATCH_CREATED_TOPIC, Arc::new(MatchNotifier))
        .unwrap_or_else(|e| panic!("event bus wiring error: {}", e));
    let running_bus = bus.start();
    info!(
        "Event bus started (queue capacity: {})",
        settings.bus.capacity
    );

    let matcher = Arc::new(SwipeMatcher::new(
        Arc::clone(&users),
        Arc::clone(&swipes),
        Arc::clone(&matches),
        running_bus.publisher(),
    ));
    let discovery = Arc::new(DiscoveryEngine::new(Arc::clone(&users)));

    let app_state = AppState {
        matcher,
        discovery,
        users,
        matches,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await?;

    // Drain queued events before exiting
    info!("Shutting down event bus...");
    running_bus.shutdown().await;
    info!("Server gracefully stopped");

    Ok(())
}
