//! AssetServer Tests
//!
//! Tests for:
//! - Successful asynchronous texture resolution
//! - Permanent failure for missing or undecodable files
//! - Pending bookkeeping across poll / next_event

use std::path::PathBuf;
use std::time::Duration;

use sheen_assets::{AssetError, AssetEvent, AssetServer, TextureFormat};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sheen-assets-{}-{name}", uuid::Uuid::new_v4()))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
}

fn wait_for_event(rt: &tokio::runtime::Runtime, server: &mut AssetServer) -> AssetEvent {
    rt.block_on(async {
        tokio::time::timeout(Duration::from_secs(10), server.next_event())
            .await
            .expect("asset load timed out")
            .expect("no pending load")
    })
}

#[test]
fn loads_png_from_disk() {
    let path = scratch_path("env.png");
    let mut img = image::RgbaImage::new(4, 2);
    img.put_pixel(3, 1, image::Rgba([1, 2, 3, 4]));
    img.save(&path).unwrap();

    let rt = runtime();
    let mut server = AssetServer::new(rt.handle().clone());
    let handle = server.load_texture(&path, TextureFormat::Rgba8Unorm);
    assert_eq!(server.pending(), 1);

    match wait_for_event(&rt, &mut server) {
        AssetEvent::TextureLoaded {
            handle: loaded,
            data,
            ..
        } => {
            assert_eq!(loaded, handle);
            assert_eq!((data.width, data.height), (4, 2));
            assert_eq!(data.texel(3, 1), [1, 2, 3, 4]);
            assert_eq!(data.format, TextureFormat::Rgba8Unorm);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(server.pending(), 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_file_reports_failure() {
    let rt = runtime();
    let mut server = AssetServer::new(rt.handle().clone());
    let handle = server.load_texture(scratch_path("does-not-exist.png"), TextureFormat::Rgba8Unorm);

    let event = wait_for_event(&rt, &mut server);
    assert_eq!(event.handle(), handle);
    assert!(matches!(
        event,
        AssetEvent::TextureFailed {
            error: AssetError::Io(_),
            ..
        }
    ));
}

#[test]
fn undecodable_file_reports_decode_error() {
    let path = scratch_path("garbage.png");
    std::fs::write(&path, b"not an image").unwrap();

    let rt = runtime();
    let mut server = AssetServer::new(rt.handle().clone());
    server.load_texture(&path, TextureFormat::Rgba8Unorm);

    let event = wait_for_event(&rt, &mut server);
    assert!(matches!(
        event,
        AssetEvent::TextureFailed {
            error: AssetError::Decode(_),
            ..
        }
    ));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn poll_is_non_blocking_and_next_event_ends_when_idle() {
    let rt = runtime();
    let mut server = AssetServer::new(rt.handle().clone());

    assert!(server.poll().is_empty());
    assert!(rt.block_on(server.next_event()).is_none());
}
