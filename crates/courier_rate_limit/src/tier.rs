//! Tier trait for representing platform rate limit constraints.

/// Rate limiting constraints of a platform API tier.
///
/// All methods return `Option<T>` where `None` means unlimited.
///
/// # Example
///
/// ```
/// use courier_rate_limit::Tier;
///
/// struct GroupChats;
///
/// impl Tier for GroupChats {
///     fn rps(&self) -> Option<u32> { Some(1) }
///     fn rpm(&self) -> Option<u32> { Some(20) }
///     fn rpd(&self) -> Option<u32> { None }
///     fn max_concurrent(&self) -> Option<u32> { Some(1) }
///     fn name(&self) -> &str { "Group chats" }
/// }
///
/// assert_eq!(GroupChats.rpm(), Some(20));
/// ```
pub trait Tier: Send + Sync {
    /// Requests per second limit.
    fn rps(&self) -> Option<u32>;

    /// Requests per minute limit.
    fn rpm(&self) -> Option<u32>;

    /// Requests per day limit.
    fn rpd(&self) -> Option<u32>;

    /// Maximum concurrent requests.
    fn max_concurrent(&self) -> Option<u32>;

    /// Name of the tier (e.g., "Standard", "Group chats").
    fn name(&self) -> &str;
}
