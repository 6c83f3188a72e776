use tracing::info;
use tracing_subscriber::EnvFilter;
use typerace::prelude::*;

const DEMO_PROMPT: &str =
    "The quick brown fox jumps over the lazy dog while the typist races the clock.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    // Demo data: two players and one room for them to race in.
    let store = MemoryStore::new();
    let alice = store.create_user("alice", "Alice")?;
    store.create_user("bob", "Bob")?;
    let room = store.create_room(alice.id, DEMO_PROMPT)?;

    let server = TyperaceServerBuilder::new().config(config).build(store).await?;
    let addr = server.local_addr()?;
    info!(%addr, room = %room.code, "demo room ready; players connect to /ws/<room>?username=<name>");

    let _reaper = server.hub().spawn_reaper();
    server.run().await?;
    Ok(())
}
