//! Serde helpers storing [`Uuid`]s as BSON binary (subtype 4), the same way
//! `bson::serde_helpers::uuid_1_as_binary` does for single ids.

use bson::Uuid as BsonUuid;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

#[inline]
pub fn to_bson(id: Uuid) -> BsonUuid {
    BsonUuid::from_uuid_1(id)
}

pub fn list_to_bson(ids: &[Uuid]) -> Vec<BsonUuid> {
    ids.iter().copied().map(to_bson).collect()
}

pub mod uuid_list_as_binary {
    use super::*;

    pub fn serialize<S: Serializer>(ids: &[Uuid], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(ids.len()))?;
        for id in ids {
            seq.serialize_element(&to_bson(*id))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Uuid>, D::Error> {
        Ok(Vec::<BsonUuid>::deserialize(deserializer)?
            .into_iter()
            .map(BsonUuid::to_uuid_1)
            .collect())
    }
}

pub mod option_uuid_as_binary {
    use super::*;

    pub fn serialize<S: Serializer>(id: &Option<Uuid>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => to_bson(*id).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Uuid>, D::Error> {
        Ok(Option::<BsonUuid>::deserialize(deserializer)?.map(BsonUuid::to_uuid_1))
    }
}
