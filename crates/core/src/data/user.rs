use super::room::MultiColor;
use crate::codec::{ByteReader, ByteWriter, CodecError};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UserPermissions: u16 {
        const MODERATOR        = 1 << 0;
        const CAN_MUTE         = 1 << 1;
        const CAN_BAN          = 1 << 2;
        const CAN_SET_PASSWORD = 1 << 3;
        const CAN_EDIT_ROLES   = 1 << 4;
        const CAN_SEND_FEATURES = 1 << 5;
        const CAN_RATE_FEATURES = 1 << 6;
        const CAN_NAME_ROOMS   = 1 << 7;
    }
}

impl UserPermissions {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_u16(self.bits());
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self::from_bits_truncate(r.read_u16()?))
    }
}

/// Role/cosmetic data attached to a player, derived from their role ids
/// (`spec.md` §3 `SpecialUserData`). Carried in `PlayerProfiles` alongside
/// each player's `PlayerIconData`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecialUserData {
    pub role_ids: Vec<u8>,
    pub name_color: Option<MultiColor>,
}

impl SpecialUserData {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_vec(&self.role_ids, |w, id| w.write_u8(*id));
        w.write_option(&self.name_color, |w, color| color.write(w));
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            role_ids: r.read_vec(|r| r.read_u8())?,
            name_color: r.read_option(MultiColor::read)?,
        })
    }
}

/// Server-issued extension of [`SpecialUserData`] carried alongside a fresh
/// auth token, e.g. after a role change (`spec.md` §3 `ExtendedUserData`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedUserData {
    pub new_token: String,
    pub role_ids: Vec<u8>,
    pub name_color: Option<MultiColor>,
    pub permissions: UserPermissions,
}

impl ExtendedUserData {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_string(&self.new_token);
        w.write_vec(&self.role_ids, |w, id| w.write_u8(*id));
        w.write_option(&self.name_color, |w, color| color.write(w));
        self.permissions.write(w);
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            new_token: r.read_string()?,
            role_ids: r.read_vec(|r| r.read_u8())?,
            name_color: r.read_option(MultiColor::read)?,
            permissions: UserPermissions::read(r)?,
        })
    }
}

impl Default for UserPermissions {
    fn default() -> Self {
        UserPermissions::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_user_data_wire_roundtrip() {
        let data = SpecialUserData {
            role_ids: vec![1, 2, 3],
            name_color: MultiColor::decode(&[0, 255, 0, 0]),
        };
        let mut w = ByteWriter::new();
        data.write(&mut w);
        let bytes = w.into_bytes();
        let decoded = SpecialUserData::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn extended_user_data_wire_roundtrip() {
        let data = ExtendedUserData {
            new_token: "fresh-token".into(),
            role_ids: vec![9],
            name_color: None,
            permissions: UserPermissions::MODERATOR | UserPermissions::CAN_BAN,
        };
        let mut w = ByteWriter::new();
        data.write(&mut w);
        let bytes = w.into_bytes();
        let decoded = ExtendedUserData::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded, data);
    }
}
