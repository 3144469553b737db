use crate::error::SyncError;
use crate::models::keys::DEVICE_ID_KEY;
use crate::store::KvStore;
use rand::distr::Alphanumeric;
use rand::Rng;

/// Returns the stable device id, creating and saving one if missing.
///
/// Format: `device_<9 lowercase alphanumerics>_<epoch millis>`. Once stored
/// the id is never reassigned.
pub fn get_or_create_device_id(store: &dyn KvStore) -> Result<String, SyncError> {
    if let Some(existing) = store.get(DEVICE_ID_KEY)? {
        if !existing.trim().is_empty() {
            return Ok(existing);
        }
    }

    let new_id = generate_device_id();
    store.set(DEVICE_ID_KEY, &new_id)?;
    log::info!("Created device id {}", new_id);
    Ok(new_id)
}

fn generate_device_id() -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!(
        "device_{}_{}",
        random,
        chrono::Utc::now().timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_device_id_format() {
        let id = generate_device_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "device");
        assert_eq!(parts[1].len(), 9);
        assert!(parts[1].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(parts[2].parse::<i64>().is_ok());
    }

    #[test]
    fn test_device_id_is_stable() {
        let store = MemoryStore::new();
        let first = get_or_create_device_id(&store).unwrap();
        let second = get_or_create_device_id(&store).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_device_id_is_kept() {
        let store = MemoryStore::new();
        store.set(DEVICE_ID_KEY, "device_legacy_1").unwrap();
        assert_eq!(get_or_create_device_id(&store).unwrap(), "device_legacy_1");
    }
}
