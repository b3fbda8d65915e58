//! Uniqueness of the two identifiers a participant carries: the national ID
//! and the bib. Both are compared as exact strings, so bib `"007"` and bib
//! `"7"` are different bibs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::repository::participant::ParticipantRepository;

pub const DUPLICATE_NATIONAL_ID: &str = "A participant with this national ID already exists";
pub const DUPLICATE_BIB: &str = "Bib is already assigned to another participant";

/// Lookups needed to tell whether an identifier is already in use.
#[async_trait]
pub trait IdentityIndex: Send + Sync {
    /// `except` skips the participant being updated.
    async fn national_id_taken(&self, national_id: &str, except: Option<Uuid>) -> Result<bool>;

    async fn bib_taken(&self, bib: &str, except: Option<Uuid>) -> Result<bool>;
}

#[async_trait]
impl IdentityIndex for ParticipantRepository<'_> {
    async fn national_id_taken(&self, national_id: &str, except: Option<Uuid>) -> Result<bool> {
        ParticipantRepository::national_id_taken(self, national_id, except).await
    }

    async fn bib_taken(&self, bib: &str, except: Option<Uuid>) -> Result<bool> {
        ParticipantRepository::bib_taken(self, bib, except).await
    }
}

/// Reject a national ID or bib held by another participant.
pub async fn ensure_unique(
    index: &dyn IdentityIndex,
    national_id: &str,
    bib: Option<&str>,
    except: Option<Uuid>,
) -> Result<()> {
    if index.national_id_taken(national_id, except).await? {
        return Err(StorageError::ConstraintViolation(
            DUPLICATE_NATIONAL_ID.to_string(),
        ));
    }

    if let Some(bib) = bib
        && index.bib_taken(bib, except).await?
    {
        return Err(StorageError::ConstraintViolation(DUPLICATE_BIB.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Registered {
        participant_id: Uuid,
        national_id: &'static str,
        bib: Option<&'static str>,
    }

    #[derive(Default)]
    struct MemoryIndex {
        participants: Vec<Registered>,
    }

    impl MemoryIndex {
        fn with(mut self, national_id: &'static str, bib: Option<&'static str>) -> Self {
            self.participants.push(Registered {
                participant_id: Uuid::new_v4(),
                national_id,
                bib,
            });
            self
        }

        fn id_of(&self, national_id: &str) -> Uuid {
            self.participants
                .iter()
                .find(|p| p.national_id == national_id)
                .map(|p| p.participant_id)
                .unwrap()
        }
    }

    #[async_trait]
    impl IdentityIndex for MemoryIndex {
        async fn national_id_taken(&self, national_id: &str, except: Option<Uuid>) -> Result<bool> {
            Ok(self
                .participants
                .iter()
                .any(|p| p.national_id == national_id && Some(p.participant_id) != except))
        }

        async fn bib_taken(&self, bib: &str, except: Option<Uuid>) -> Result<bool> {
            Ok(self
                .participants
                .iter()
                .any(|p| p.bib == Some(bib) && Some(p.participant_id) != except))
        }
    }

    fn conflict_message(result: Result<()>) -> String {
        match result {
            Err(StorageError::ConstraintViolation(msg)) => msg,
            other => panic!("expected a conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_bib_conflicts() {
        let index = MemoryIndex::default().with("1111111", Some("42"));

        let result = ensure_unique(&index, "2222222", Some("42"), None).await;
        assert_eq!(conflict_message(result), DUPLICATE_BIB);
    }

    #[tokio::test]
    async fn test_duplicate_national_id_conflicts() {
        let index = MemoryIndex::default().with("1111111", None);

        let result = ensure_unique(&index, "1111111", Some("9"), None).await;
        assert_eq!(conflict_message(result), DUPLICATE_NATIONAL_ID);
    }

    #[tokio::test]
    async fn test_leading_zeros_make_a_different_bib() {
        let index = MemoryIndex::default().with("1111111", Some("007"));

        assert!(ensure_unique(&index, "2222222", Some("7"), None).await.is_ok());
        assert!(ensure_unique(&index, "3333333", Some("007"), None).await.is_err());
    }

    #[tokio::test]
    async fn test_participant_keeps_own_identifiers_on_update() {
        let index = MemoryIndex::default()
            .with("1111111", Some("007"))
            .with("2222222", Some("8"));
        let own = index.id_of("1111111");

        assert!(ensure_unique(&index, "1111111", Some("007"), Some(own)).await.is_ok());

        let result = ensure_unique(&index, "1111111", Some("8"), Some(own)).await;
        assert_eq!(conflict_message(result), DUPLICATE_BIB);
    }

    #[tokio::test]
    async fn test_no_bib_skips_bib_check() {
        let index = MemoryIndex::default().with("1111111", None);

        assert!(ensure_unique(&index, "2222222", None, None).await.is_ok());
    }
}
