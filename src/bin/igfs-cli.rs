//! Thin demo binary: loads an [`igfs_core::config::IgfsConfig`], prints its
//! resolved mode table, then runs a smoke `mkdirs`+`create` against an
//! in-memory two-store backend. Mirrors the role the teacher's
//! `examples/shadow_fs/main.rs` plays for its `Vfs` trait — not a product
//! surface, just enough to drive the core from a command line.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use igfs_core::collab::discovery::NodeId;
use igfs_core::collab::eviction::NoExclusions;
use igfs_core::collab::memory::{
    InMemoryDataManager, InMemoryDiscovery, InMemoryEventBus, InMemoryMessaging, InMemoryMetadataManager, MessageRouter, SharedCluster,
    StubComputeService,
};
use igfs_core::config::IgfsConfig;
use igfs_core::igfs::IgfsCollaborators;
use igfs_core::{IgfsImpl, Path};

#[derive(Parser)]
#[command(name = "igfs-cli", about = "Demo driver for the IGFS coordinator")]
struct Args {
    /// Path to a TOML config file (see `IgfsConfig` for the schema).
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.config).unwrap_or_else(|err| panic!("failed to read {:?}: {err}", args.config));
    let config = IgfsConfig::from_toml(&raw).unwrap_or_else(|err| panic!("invalid config: {err}"));

    println!("igfs `{}`: default mode = {:?}, secondary = {}", config.name, config.resolved_default_mode().unwrap(), config.has_secondary);
    for row in &config.prefixes {
        println!("  {} -> {}", row.path, row.mode);
    }

    let igfs = build(&config);

    let dir = Path::parse("/demo").expect("valid path");
    igfs.mkdirs(&dir, None).await.expect("mkdirs");
    let file = Path::parse("/demo/hello.txt").expect("valid path");
    let mut writer = igfs.create(&file, 0, true, None, None).await.expect("create");
    writer.write(b"hello from igfs-cli").await.expect("write");
    writer.close().await;

    let listing = igfs.list_paths(&dir).await.expect("list_paths");
    println!("listing of {dir}: {listing:?}");

    igfs.stop().await;
}

fn build(config: &IgfsConfig) -> IgfsImpl {
    let metadata = Arc::new(InMemoryMetadataManager::new(None));
    let data = InMemoryDataManager::new(NodeId(1), 1024 * 1024);
    let events = Arc::new(InMemoryEventBus::new());
    let cluster = SharedCluster::new(vec![NodeId(1)]);
    let discovery = Arc::new(InMemoryDiscovery::new(cluster.clone(), NodeId(1)));
    let router = MessageRouter::new();
    let messaging = Arc::new(InMemoryMessaging::new(router, cluster, NodeId(1)));
    let compute = Arc::new(StubComputeService::new());
    let eviction = Arc::new(NoExclusions);

    IgfsImpl::new(config, IgfsCollaborators { metadata, data, secondary: None, discovery, messaging, compute, events, eviction })
        .expect("failed to build IgfsImpl")
}
