//! User and group name resolution against the local system.

use darc_core::OwnerLookup;

/// Looks owners up in the system user and group databases.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

#[cfg(unix)]
impl OwnerLookup for SystemLookup {
    fn user_name(&self, uid: u32) -> Option<String> {
        uzers::get_user_by_uid(uid)
            .map(|user| user.name().to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
    }

    fn user_id(&self, name: &str) -> Option<u32> {
        uzers::get_user_by_name(name).map(|user| user.uid())
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        uzers::get_group_by_gid(gid)
            .map(|group| group.name().to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        uzers::get_group_by_name(name).map(|group| group.gid())
    }
}

#[cfg(not(unix))]
impl OwnerLookup for SystemLookup {
    fn user_name(&self, _uid: u32) -> Option<String> {
        None
    }

    fn user_id(&self, _name: &str) -> Option<u32> {
        None
    }

    fn group_name(&self, _gid: u32) -> Option<String> {
        None
    }

    fn group_id(&self, _name: &str) -> Option<u32> {
        None
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use darc_core::OwnerNames;

    #[test]
    fn test_root_roundtrip() {
        let names = OwnerNames::new(SystemLookup);
        if let Some(name) = names.uid_to_user(0) {
            assert_eq!(names.user_to_uid(&name), Some(0));
        }
    }

    #[test]
    fn test_unknown_name() {
        let names = OwnerNames::new(SystemLookup);
        assert_eq!(names.user_to_uid("no-such-user-darc-test"), None);
        assert_eq!(names.group_to_gid("no-such-group-darc-test"), None);
    }
}
