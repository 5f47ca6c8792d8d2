//! Sample graph shared by unit tests

use crate::memory::MemorySource;
use crate::node::{Node, NodeRef};
use crate::schema::{
    AttributeSchema, Cardinality, NodeKind, RelationshipKind, RelationshipSchema,
    SchemaDescriptor,
};

pub(crate) fn device_schema() -> SchemaDescriptor {
    SchemaDescriptor::new(
        "InfraDevice",
        vec![
            AttributeSchema::new("name"),
            AttributeSchema::new("description"),
        ],
        vec![
            RelationshipSchema::new("site", "LocationSite", Cardinality::One, RelationshipKind::Attribute),
            RelationshipSchema::new("platform", "InfraPlatform", Cardinality::One, RelationshipKind::Attribute),
            RelationshipSchema::new("tags", "BuiltinTag", Cardinality::Many, RelationshipKind::Attribute),
            RelationshipSchema::new("interfaces", "InfraInterface", Cardinality::Many, RelationshipKind::Component),
        ],
    )
    .unwrap()
}

pub(crate) fn schemas() -> Vec<SchemaDescriptor> {
    vec![
        device_schema(),
        SchemaDescriptor::new(
            "LocationSite",
            vec![AttributeSchema::new("name"), AttributeSchema::new("shortname")],
            vec![RelationshipSchema::new(
                "devices",
                "InfraDevice",
                Cardinality::Many,
                RelationshipKind::Component,
            )],
        )
        .unwrap(),
        SchemaDescriptor::new(
            "InfraPlatform",
            vec![
                AttributeSchema::new("name"),
                AttributeSchema::new("ansible_network_os"),
            ],
            vec![],
        )
        .unwrap(),
        SchemaDescriptor::new("BuiltinTag", vec![AttributeSchema::new("name")], vec![]).unwrap(),
        // InfraInterface is generic and has no schema of its own
        SchemaDescriptor::new(
            "InfraInterfaceL3",
            vec![AttributeSchema::new("name"), AttributeSchema::new("speed")],
            vec![],
        )
        .unwrap()
        .with_inherit_from(vec![NodeKind::from("InfraInterface")]),
    ]
}

pub(crate) fn nodes() -> Vec<Node> {
    vec![
        Node::new("s1", "LocationSite")
            .with_display_label("atl1")
            .with_attribute("name", "atl1")
            .with_attribute("shortname", "")
            .with_many("devices", vec![NodeRef::new("d1"), NodeRef::new("d2")]),
        Node::new("p1", "InfraPlatform")
            .with_attribute("name", "eos")
            .with_attribute("ansible_network_os", "arista.eos.eos"),
        Node::new("t1", "BuiltinTag").with_attribute("name", "red"),
        Node::new("t2", "BuiltinTag").with_attribute("name", "blue"),
        Node::new("i1", "InfraInterfaceL3")
            .with_attribute("name", "Ethernet1")
            .with_attribute("speed", 1000),
        Node::new("i2", "InfraInterfaceL3")
            .with_attribute("name", "Ethernet2")
            .with_attribute("speed", 0),
        Node::new("d1", "InfraDevice")
            .with_display_label("atl1-edge1")
            .with_attribute("name", "atl1-edge1")
            .with_attribute("description", "")
            .with_one("site", Some(NodeRef::new("s1").with_kind("LocationSite")))
            .with_one("platform", Some(NodeRef::new("p1")))
            .with_many("tags", vec![NodeRef::new("t1"), NodeRef::new("t2")])
            .with_many(
                "interfaces",
                vec![
                    NodeRef::new("i1").with_kind("InfraInterfaceL3"),
                    NodeRef::new("i2").with_kind("InfraInterfaceL3"),
                ],
            ),
        Node::new("d2", "InfraDevice")
            .with_attribute("name", "atl1-edge2")
            .with_attribute("description", serde_json::Value::Null)
            .with_one("site", Some(NodeRef::new("s1")))
            .with_one("platform", None)
            .with_many("tags", vec![])
            .with_many("interfaces", vec![]),
    ]
}

pub(crate) fn source() -> MemorySource {
    MemorySource::new(schemas(), nodes())
}
