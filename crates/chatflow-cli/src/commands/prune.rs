use anyhow::Result;
use chatflow_infrastructure::DurableTranscriptStore;

/// Removes locally persisted transcripts whose every message has been
/// acknowledged by the backend.
pub fn run() -> Result<()> {
    let store = DurableTranscriptStore::default_location()?;
    let mut pruned = 0usize;
    for session_id in store.list_session_ids()? {
        if let Some(transcript) = store.load(&session_id)? {
            if store.prune_if_synced(&transcript)? {
                pruned += 1;
                println!("pruned {session_id}");
            }
        }
    }
    println!("{pruned} transcript(s) pruned");
    Ok(())
}
