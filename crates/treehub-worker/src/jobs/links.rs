//! Reference-dataset links over the fixed organization / field / well
//! levels.
//!
//! Roots are matched to organizations by name, depth-1 nodes to the fields
//! of their root's organization, and depth-3 nodes to the wells of their
//! depth-1 ancestor's field. Well names are compared after padding their
//! leading number to three digits. Links are only added or corrected;
//! unmatched nodes are left as they are.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use treehub_database::{NodeField, NodeFilter, NodePatch, NodeUpdate};
use treehub_entity::reference::{Field, Organization, Well};
use treehub_entity::{DbRef, DbRefType, Node};

use crate::context::EngineContext;
use crate::error::PassError;
use crate::executor::{JobHandler, JobKind, JobReport};
use crate::fold::{LevelReport, PassSummary};
use crate::reader::LevelReader;
use crate::writer::BatchWriter;

/// Depth of organization folders.
const ORGANIZATION_DEPTH: i32 = 0;
/// Depth of field folders.
const FIELD_DEPTH: i32 = 1;
/// Depth of well folders.
const WELL_DEPTH: i32 = 3;

const LINK_FIELDS: &[NodeField] = &[NodeField::Name, NodeField::DbRef];

/// Links nodes to organizations, fields and wells.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinksJob;

#[async_trait]
impl JobHandler for LinksJob {
    fn kind(&self) -> JobKind {
        JobKind::Links
    }

    async fn execute(&self, ctx: &EngineContext, _max_depth: Option<i32>) -> JobReport {
        let mut pass = PassSummary {
            name: "links".to_string(),
            max_depth: Some(WELL_DEPTH),
            ..PassSummary::default()
        };

        let mut report = LevelReport {
            depth: ORGANIZATION_DEPTH,
            ..LevelReport::default()
        };
        let outcome = link_organizations(ctx, &mut report).await;
        pass.record(report, outcome);

        let mut report = LevelReport {
            depth: FIELD_DEPTH,
            ..LevelReport::default()
        };
        let outcome = link_fields(ctx, &mut report).await;
        pass.record(report, outcome);

        let mut report = LevelReport {
            depth: WELL_DEPTH,
            ..LevelReport::default()
        };
        let outcome = link_wells(ctx, &mut report).await;
        pass.record(report, outcome);

        JobReport::from_pass(self.kind(), pass)
    }
}

fn link_update(node: &Node, db_ref: DbRef) -> Option<NodeUpdate> {
    (node.db_ref.as_ref() != Some(&db_ref)).then(|| {
        NodeUpdate::new(
            node.id.clone(),
            NodePatch {
                db_ref: Some(db_ref),
                ..NodePatch::default()
            },
        )
    })
}

fn linked_as(node: &Node, db_type: DbRefType) -> Option<&DbRef> {
    node.db_ref.as_ref().filter(|r| r.db_type == db_type)
}

async fn write(
    ctx: &EngineContext,
    updates: Vec<NodeUpdate>,
    report: &mut LevelReport,
) -> Result<(), PassError> {
    let mut writer = BatchWriter::new(ctx.nodes.as_ref(), ctx.config.batch_size);
    writer.stage_all(updates).await?;
    writer.flush().await?;
    report.write = writer.progress();
    Ok(())
}

async fn link_organizations(ctx: &EngineContext, report: &mut LevelReport) -> Result<(), PassError> {
    let organizations = ctx
        .references
        .organizations()
        .await
        .map_err(PassError::read)?;
    let mut by_name: HashMap<&str, &Organization> = HashMap::new();
    for org in &organizations {
        by_name.entry(org.db_name.as_str()).or_insert(org);
    }

    let reader = LevelReader::new(ctx.nodes.as_ref(), ctx.config.page_size);
    let roots = reader
        .read_level(ORGANIZATION_DEPTH, LINK_FIELDS)
        .await
        .map_err(PassError::read)?;
    report.children = roots.nodes.len();
    report.malformed = roots.malformed;

    let updates: Vec<NodeUpdate> = roots
        .nodes
        .iter()
        .filter_map(|root| {
            let org = by_name.get(root.name.as_str())?;
            link_update(root, DbRef::organization(org.id.clone()))
        })
        .collect();

    info!(matched = updates.len(), "Organizations linked");
    write(ctx, updates, report).await
}

async fn link_fields(ctx: &EngineContext, report: &mut LevelReport) -> Result<(), PassError> {
    let reader = LevelReader::new(ctx.nodes.as_ref(), ctx.config.page_size);
    let roots = reader
        .read_level(ORGANIZATION_DEPTH, &[NodeField::DbRef])
        .await
        .map_err(PassError::read)?;

    let mut updates = Vec::new();
    for root in &roots.nodes {
        let Some(org_ref) = linked_as(root, DbRefType::Organization) else {
            continue;
        };
        report.parents += 1;

        let fields = ctx
            .references
            .fields_of(&org_ref.id)
            .await
            .map_err(PassError::read)?;
        if fields.is_empty() {
            continue;
        }
        let mut by_name: HashMap<&str, &Field> = HashMap::new();
        for field in &fields {
            by_name.entry(field.db_name.as_str()).or_insert(field);
        }

        let children = reader
            .read(
                NodeFilter::at_depth(FIELD_DEPTH).with_parents(vec![root.id.clone()]),
                LINK_FIELDS,
            )
            .await
            .map_err(PassError::read)?;
        report.children += children.nodes.len();
        report.malformed += children.malformed;

        let before = updates.len();
        updates.extend(children.nodes.iter().filter_map(|child| {
            let field = by_name.get(child.name.as_str())?;
            link_update(child, DbRef::field(field.id.clone(), org_ref.id.clone()))
        }));
        debug!(organization = %org_ref.id, linked = updates.len() - before, "Fields linked");
    }

    write(ctx, updates, report).await
}

async fn link_wells(ctx: &EngineContext, report: &mut LevelReport) -> Result<(), PassError> {
    let reader = LevelReader::new(ctx.nodes.as_ref(), ctx.config.page_size);
    let field_nodes = reader
        .read_level(FIELD_DEPTH, &[NodeField::DbRef])
        .await
        .map_err(PassError::read)?;
    let linked: Vec<(&Node, &DbRef)> = field_nodes
        .nodes
        .iter()
        .filter_map(|n| linked_as(n, DbRefType::Field).map(|r| (n, r)))
        .collect();
    report.parents = linked.len();

    let mut pending = Vec::with_capacity(linked.len());
    for (node, field_ref) in linked {
        pending.push(well_updates(ctx, reader, node, field_ref));
    }
    let groups: Vec<Result<WellGroup, PassError>> = stream::iter(pending)
        .buffer_unordered(ctx.config.link_concurrency.max(1))
        .collect()
        .await;

    let mut updates = Vec::new();
    for group in groups {
        let group = group?;
        report.children += group.scanned;
        report.malformed += group.malformed;
        updates.extend(group.updates);
    }

    info!(matched = updates.len(), "Wells linked");
    write(ctx, updates, report).await
}

/// Well updates computed for one field subtree.
struct WellGroup {
    updates: Vec<NodeUpdate>,
    scanned: usize,
    malformed: usize,
}

async fn well_updates(
    ctx: &EngineContext,
    reader: LevelReader<'_>,
    field_node: &Node,
    field_ref: &DbRef,
) -> Result<WellGroup, PassError> {
    let wells = ctx
        .references
        .wells_of(&field_ref.id)
        .await
        .map_err(PassError::read)?;
    if wells.is_empty() {
        return Ok(WellGroup {
            updates: Vec::new(),
            scanned: 0,
            malformed: 0,
        });
    }
    let mut by_name: HashMap<String, &Well> = HashMap::new();
    for well in &wells {
        by_name.entry(well.folder_name()).or_insert(well);
    }

    let nodes = reader
        .read(
            NodeFilter::at_depth(WELL_DEPTH).under(field_node.id.clone()),
            LINK_FIELDS,
        )
        .await
        .map_err(PassError::read)?;

    let updates = nodes
        .nodes
        .iter()
        .filter_map(|node| {
            let well = by_name.get(&node.name)?;
            let db_ref = DbRef::well(
                well.id.clone(),
                field_ref.id_organization.clone(),
                field_ref.id.clone(),
            );
            link_update(node, db_ref)
        })
        .collect();

    Ok(WellGroup {
        updates,
        scanned: nodes.nodes.len(),
        malformed: nodes.malformed,
    })
}
