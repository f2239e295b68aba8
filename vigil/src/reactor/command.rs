use super::registrant::{Registrant, Token};

/// A registry change requested through a [`ReactorHandle`](super::ReactorHandle).
///
/// Commands are queued and applied by the loop at its next safe point.
pub(crate) enum Command {
    Register { token: Token, registrant: Registrant },
    Deregister { token: Token },
}
