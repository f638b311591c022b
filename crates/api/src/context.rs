use chainvoice_core::OwnerId;

/// Owner context for a request.
///
/// Resolved once by the auth middleware and threaded explicitly through every
/// store operation — there is no ambient "current user" anywhere below this.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    owner_id: OwnerId,
}

impl OwnerContext {
    pub fn new(owner_id: OwnerId) -> Self {
        Self { owner_id }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}
