//! Conversion of borrowed `osmpbf` elements into owned core entities.

use osmarea_core::{
    Entity, EntityInfo, EntityKind, EntityRef, Location, Member, MemberKind, Node, Relation,
    SourceError, Tags, Way,
};
use osmpbf::{Element, RelMemberType};

fn owned_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn seconds(milli_timestamp: i64) -> i64 {
    milli_timestamp.div_euclid(1_000)
}

fn info(source: &osmpbf::Info<'_>) -> EntityInfo {
    EntityInfo {
        version: source.version().and_then(|version| u32::try_from(version).ok()),
        visible: source.visible(),
        uid: source.uid().and_then(|uid| u32::try_from(uid).ok()),
        user: source
            .user()
            .and_then(Result::ok)
            .map(ToOwned::to_owned),
        timestamp: source.milli_timestamp().map(seconds),
        changeset: source.changeset(),
    }
}

fn dense_info(source: Option<&osmpbf::DenseNodeInfo<'_>>) -> EntityInfo {
    source.map_or_else(EntityInfo::default, |dense| EntityInfo {
        version: u32::try_from(dense.version()).ok(),
        visible: dense.visible(),
        uid: u32::try_from(dense.uid()).ok(),
        user: dense.user().ok().map(ToOwned::to_owned),
        timestamp: Some(seconds(dense.milli_timestamp())),
        changeset: Some(dense.changeset()),
    })
}

const fn member_kind(kind: &RelMemberType) -> MemberKind {
    match kind {
        RelMemberType::Node => MemberKind::Node,
        RelMemberType::Way => MemberKind::Way,
        RelMemberType::Relation => MemberKind::Relation,
    }
}

/// Convert one decoded element.
///
/// `location` names the block for error reporting.
pub(super) fn entity(element: &Element<'_>, location: &str) -> Result<Entity, SourceError> {
    Ok(match element {
        Element::Node(node) => Entity::Node(Node {
            id: node.id(),
            location: Location::new(node.decimicro_lon(), node.decimicro_lat()),
            tags: owned_tags(node.tags()),
            info: info(&node.info()),
        }),
        Element::DenseNode(node) => Entity::Node(Node {
            id: node.id(),
            location: Location::new(node.decimicro_lon(), node.decimicro_lat()),
            tags: owned_tags(node.tags()),
            info: dense_info(node.info()),
        }),
        Element::Way(way) => {
            let mut owned = Way::new(way.id(), way.refs());
            owned.tags = owned_tags(way.tags());
            owned.info = info(&way.info());
            Entity::Way(owned)
        }
        Element::Relation(relation) => {
            let members = relation
                .members()
                .map(|member| {
                    let role = member.role().map_err(|source| SourceError::Decode {
                        location: location.to_owned(),
                        entity: Some(EntityRef::new(EntityKind::Relation, relation.id())),
                        source: source.into(),
                    })?;
                    Ok(Member::new(
                        member_kind(&member.member_type),
                        member.member_id,
                        role,
                    ))
                })
                .collect::<Result<Vec<_>, SourceError>>()?;
            let mut owned = Relation::new(relation.id(), members);
            owned.tags = owned_tags(relation.tags());
            owned.info = info(&relation.info());
            Entity::Relation(owned)
        }
    })
}
