use crate::error::LinkError;
use crate::MAX_INSERT_ATTEMPTS;
use parcel_core::{
    AccessKind, AccessLogEntry, AccessLogStore, AccessTarget, Clock, CodeStyle, ExpirationPolicy,
    LinkId, LinkRepository, NewLink, OwnerId, RequestMeta, ShortCode, ShortLink, StorageError,
    SystemClock,
};
use parcel_generator::{AllocationError, AllocatorSettings, ShortCodeAllocator};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Short links, allocated in their own code namespace.
pub struct LinkService<L: ?Sized, A: ?Sized, K: ?Sized = SystemClock> {
    links: Arc<L>,
    access_log: Arc<A>,
    clock: Arc<K>,
    allocator: ShortCodeAllocator<L>,
}

impl<L, A, K> LinkService<L, A, K>
where
    L: LinkRepository + ?Sized,
    A: AccessLogStore + ?Sized,
    K: Clock + ?Sized,
{
    pub fn new(
        links: Arc<L>,
        access_log: Arc<A>,
        clock: Arc<K>,
        allocator: &AllocatorSettings,
    ) -> Result<Self, AllocationError> {
        let allocator = ShortCodeAllocator::new(Arc::clone(&links), allocator)?;
        Ok(Self {
            links,
            access_log,
            clock,
            allocator,
        })
    }

    /// Validates that the URL has a valid format (has a scheme and host).
    fn validate_url(url: &str) -> Result<(), LinkError> {
        if url.is_empty() {
            return Err(LinkError::InvalidUrl("URL cannot be empty".to_string()));
        }

        // A valid URL has "://" with something on both sides
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(LinkError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {url}"
            )));
        };
        if scheme.is_empty() || rest.is_empty() {
            return Err(LinkError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {url}"
            )));
        }

        let scheme = scheme.to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(LinkError::InvalidUrl(format!(
                "URL scheme must be http or https: {scheme}"
            )));
        }

        Ok(())
    }

    pub async fn shorten(
        &self,
        owner: Option<OwnerId>,
        url: &str,
        style: CodeStyle,
        expiration: ExpirationPolicy,
    ) -> Result<ShortLink, LinkError> {
        Self::validate_url(url)?;

        let now = self.clock.now();
        let expires_at = expiration.resolve(now);

        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let code = self.allocator.allocate(style).await?;
            let link = NewLink {
                owner,
                code,
                target_url: url.to_string(),
                expires_at,
                created_at: now,
            };

            match self.links.insert(link).await {
                Ok(link) => {
                    info!(link_id = %link.id, code = %link.code, owner_id = ?owner, "link created");
                    return Ok(link);
                }
                Err(StorageError::Conflict(code)) => {
                    debug!(attempt, %code, "short code taken at insert, reallocating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LinkError::CodeConflict {
            attempts: MAX_INSERT_ATTEMPTS,
        })
    }

    /// Resolves a code to its link without recording anything.
    pub async fn resolve(&self, code: &str) -> Result<ShortLink, LinkError> {
        let code = ShortCode::new(code).map_err(|_| LinkError::NotFound(code.to_string()))?;
        let link = self
            .links
            .get_by_code(&code)
            .await?
            .ok_or_else(|| LinkError::NotFound(code.to_string()))?;
        if link.is_expired(self.clock.now()) {
            return Err(LinkError::Expired(code));
        }
        Ok(link)
    }

    /// Resolves a link for a redirect and records the click.
    ///
    /// Recording is best effort: a failed log write or counter bump is
    /// logged and the redirect still goes ahead.
    pub async fn follow(&self, code: &str, meta: RequestMeta) -> Result<ShortLink, LinkError> {
        let link = self.resolve(code).await?;

        let entry = AccessLogEntry::new(
            AccessTarget::Link(link.id),
            link.owner,
            AccessKind::Click,
            self.clock.now(),
            meta,
        );
        if let Err(err) = self.access_log.append(entry).await {
            warn!(link_id = %link.id, error = %err, "failed to log click");
        }
        if let Err(err) = self.links.increment_clicks(link.id).await {
            warn!(link_id = %link.id, error = %err, "failed to count click");
        }

        Ok(link)
    }

    pub async fn get(&self, id: LinkId) -> Result<Option<ShortLink>, LinkError> {
        Ok(self.links.get(id).await?)
    }

    pub async fn delete(&self, owner: OwnerId, id: LinkId) -> Result<(), LinkError> {
        let link = self
            .links
            .get(id)
            .await?
            .ok_or_else(|| LinkError::NotFound(id.to_string()))?;
        if link.owner != Some(owner) {
            return Err(LinkError::NotOwner { id, owner });
        }
        if !self.links.delete(id).await? {
            return Err(LinkError::NotFound(id.to_string()));
        }
        info!(link_id = %id, owner_id = %owner, "link deleted");
        Ok(())
    }
}
