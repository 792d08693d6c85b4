//! Tests for ServerContext

use super::*;

use std::fs;
use std::str::FromStr;

use strand_protocol::Uuid;

fn config(apps: usize, viewers: usize) -> Config {
    let mut config = Config::from_str("[global]\nbuffer_capacity = 128").unwrap();
    config.listener.allowed_apps = (0..apps).map(|_| Uuid::new_v4()).collect();
    config.viewers.allowed_viewers = (0..viewers).map(|_| Uuid::new_v4()).collect();
    config
}

#[test]
fn test_builds_shared_state() {
    let config = config(2, 3);
    let viewers = config.viewers.allowed_viewers.clone();

    let ctx = ServerContext::from_config(config).unwrap();

    assert_eq!(ctx.buffer.capacity(), 128);
    assert_eq!(ctx.allowed_apps.len(), 2);
    assert_eq!(ctx.registry.len(), 3);
    assert_eq!(ctx.registry.lookup(&viewers[2]), Some(2));
    assert_eq!(ctx.connections.count(), 0);
}

#[test]
fn test_no_applications_rejected() {
    let err = ServerContext::from_config(config(0, 1)).err().unwrap();
    assert!(matches!(err, StartupError::NoApplications));
}

#[test]
fn test_no_viewers_rejected() {
    let err = ServerContext::from_config(config(1, 0)).err().unwrap();
    assert!(matches!(err, StartupError::NoViewers));
}

#[test]
fn test_too_many_viewers_rejected() {
    let mut config = config(1, 5);
    config.viewers.max_viewers = 4;

    let err = ServerContext::from_config(config).err().unwrap();
    assert!(matches!(err, StartupError::Registry(_)));
}

#[test]
fn test_allow_list_file_preferred() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viewers.conf");
    let from_file = Uuid::new_v4();
    fs::write(&path, format!("# viewers\n{from_file}\n")).unwrap();

    let mut config = config(1, 3);
    config.viewers.allowed_viewers_file = Some(path);

    let ctx = ServerContext::from_config(config).unwrap();
    assert_eq!(ctx.registry.len(), 1);
    assert_eq!(ctx.registry.lookup(&from_file), Some(0));
}

#[test]
fn test_bad_allow_list_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apps.conf");
    fs::write(&path, "not-a-uuid\n").unwrap();

    let mut config = config(1, 1);
    config.listener.allowed_apps_file = Some(path);

    let err = ServerContext::from_config(config).err().unwrap();
    assert!(matches!(
        err,
        StartupError::AllowList {
            list: "application",
            ..
        }
    ));
}
