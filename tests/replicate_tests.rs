use clipbook::replicate::{MemoryStore, RemoteReplicator};
use clipbook::ReviewError;
use std::sync::Arc;

fn replicator(store: &Arc<MemoryStore>) -> RemoteReplicator {
    RemoteReplicator::new(Box::new(Arc::clone(store)))
}

#[test]
fn test_first_replication_uploads_suffixed_copy() {
    let store = Arc::new(MemoryStore::new());
    let report = replicator(&store)
        .replicate(b"v1", "tweets.csv", "tweets.csv")
        .unwrap();

    assert_eq!(report.uploaded, "tweets_autoPush.csv");
    assert!(report.pruned.is_empty());
    assert_eq!(store.names(), vec!["tweets_autoPush.csv"]);
}

#[test]
fn test_repeated_replication_keeps_one_artifact() {
    let store = Arc::new(MemoryStore::new());
    let rep = replicator(&store);
    rep.replicate(b"v1", "tweets.csv", "tweets.csv").unwrap();
    rep.replicate(b"v2", "tweets.csv", "tweets.csv").unwrap();

    assert_eq!(store.names(), vec!["tweets_autoPush.csv"]);
    assert_eq!(store.get("tweets_autoPush.csv").unwrap(), b"v2");
}

#[test]
fn test_manual_upload_of_same_dataset_is_pruned() {
    let store = Arc::new(MemoryStore::new());
    store.insert("Tweets.csv", b"manual");
    store.insert("other.csv", b"unrelated");

    let report = replicator(&store)
        .replicate(b"v1", "tweets.csv", "tweets.csv")
        .unwrap();

    assert_eq!(report.pruned, vec!["Tweets.csv"]);
    assert_eq!(store.names(), vec!["other.csv", "tweets_autoPush.csv"]);
}

#[test]
fn test_upload_failure_is_an_error() {
    let store = Arc::new(MemoryStore::new().failing_uploads());
    store.insert("tweets.csv", b"manual");

    let err = replicator(&store)
        .replicate(b"v1", "tweets.csv", "tweets.csv")
        .unwrap_err();

    assert!(matches!(err, ReviewError::Replication(_)));
    // Nothing is pruned when the upload did not land.
    assert_eq!(store.names(), vec!["tweets.csv"]);
}

#[test]
fn test_prune_failure_is_reported_not_raised() {
    let store = Arc::new(MemoryStore::new().failing_deletes());
    store.insert("tweets.csv", b"manual");

    let report = replicator(&store)
        .replicate(b"v1", "tweets.csv", "tweets.csv")
        .unwrap();

    assert_eq!(report.uploaded, "tweets_autoPush.csv");
    assert!(report.pruned.is_empty());
    assert_eq!(report.prune_failures, vec!["tweets.csv"]);
    assert_eq!(store.names(), vec!["tweets.csv", "tweets_autoPush.csv"]);
}
