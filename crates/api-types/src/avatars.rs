//! The fixed avatar catalogue offered at signup.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Avatar {
    pub id: &'static str,
    pub url: &'static str,
    pub label: &'static str,
}

pub static AVATARS: [Avatar; 12] = [
    Avatar { id: "bear", url: "/avatars/bear.png", label: "The Bear" },
    Avatar { id: "cat", url: "/avatars/cat.png", label: "The Phantom" },
    Avatar { id: "rabbit", url: "/avatars/rabbit.png", label: "The Ghost" },
    Avatar { id: "chicken", url: "/avatars/chicken.png", label: "The Rogue" },
    Avatar { id: "meerkat", url: "/avatars/meerkat.png", label: "The Watcher" },
    Avatar { id: "panda", url: "/avatars/panda.png", label: "The Shadow" },
    Avatar { id: "gamer", url: "/avatars/gamer.png", label: "The Hunter" },
    Avatar { id: "boy", url: "/avatars/boy.png", label: "The Drifter" },
    Avatar { id: "woman", url: "/avatars/woman.png", label: "The Stalker" },
    Avatar { id: "woman2", url: "/avatars/woman2.png", label: "The Tracker" },
    Avatar { id: "woman3", url: "/avatars/woman3.png", label: "The Specter" },
    Avatar { id: "woman4", url: "/avatars/woman4.png", label: "The Wraith" },
];

impl Avatar {
    pub fn find(id: &str) -> Option<&'static Avatar> {
        AVATARS.iter().find(|a| a.id == id)
    }

    /// Unknown or missing ids fall back to the first avatar.
    pub fn find_or_default(id: Option<&str>) -> &'static Avatar {
        id.and_then(Self::find).unwrap_or(&AVATARS[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_lookup() {
        assert_eq!(Avatar::find("panda").unwrap().label, "The Shadow");
        assert!(Avatar::find("dragon").is_none());
    }

    #[test]
    fn test_avatar_fallback() {
        assert_eq!(Avatar::find_or_default(None).id, "bear");
        assert_eq!(Avatar::find_or_default(Some("dragon")).id, "bear");
        assert_eq!(Avatar::find_or_default(Some("woman4")).id, "woman4");
    }
}
