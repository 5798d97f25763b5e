use super::IdentityClaims;

/// Decide the effective user id for a request.
///
/// An explicit `X-USER-ID` from an earlier hop wins over the token subject.
/// Blank header values count as absent.
pub fn resolve(header_user_id: Option<&str>, claims: Option<&IdentityClaims>) -> Option<String> {
    header_user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| claims.map(|c| c.subject.clone()))
}
