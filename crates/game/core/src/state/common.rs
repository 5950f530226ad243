//! Identifier newtypes shared across the game model.

use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Platform user id of a player (or any voter).
    PlayerId
);
id_newtype!(
    /// Identifier of a game definition whose signups seed `start`.
    GameId
);
id_newtype!(
    /// One independent deployment of the game, e.g. a single chat server.
    InstanceId
);
id_newtype!(
    /// Id of a message posted through the notification collaborator.
    MessageId
);
