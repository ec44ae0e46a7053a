//! The reconciliation engine.
//!
//! One call reconciles a single MTO number against the nine source
//! documents and emits the parent record plus the per-material status list.
//! Stateless per call: every accumulator lives in call-local structures, so
//! any number of reconciliations may run concurrently over the shared ERP
//! client.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::erp::{ErpClient, ErpError};
use crate::errors::ServiceError;
use crate::models::{MaterialStatus, MaterialType, MtoStatusResponse, ParentRecord};
use crate::sources::forms::{
    BomLineRow, DeliveryRow, PickingRow, ProductionOrderRow, ProductionReceiptRow,
    PurchaseOrderRow, PurchaseReceiptRow, SalesOrderRow, SubcontractOrderRow,
};
use crate::sources::{convert_rows, ErpForm, SourceReader};
use crate::staging::StagingStore;

use super::aux_props::AuxPropertyResolver;
use super::bom_rollup::{self, BomRollup, SummedQtys};
use super::quantity_tables::{self, TypeQuantities};

/// Material-code prefix routing. The prefix is the primary type signal for
/// rows that carry no explicit flag.
#[derive(Debug, Clone)]
pub struct MaterialPrefixes {
    pub finished: Vec<String>,
    pub self_made: Vec<String>,
    pub purchased: Vec<String>,
}

impl Default for MaterialPrefixes {
    fn default() -> Self {
        Self {
            finished: vec!["01.".to_string()],
            self_made: vec!["05.".to_string()],
            purchased: vec!["08.".to_string()],
        }
    }
}

/// Immutable engine configuration. Reconfiguration means constructing a new
/// engine instance; nothing here is mutated after startup.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub prefixes: MaterialPrefixes,
    /// Bill-type code marking purchased receipts on the shared inbound form.
    pub purchase_bill_type: String,
    /// Bill-type code marking subcontracted receipts on the same form.
    pub subcontract_bill_type: String,
    /// Prefer the staging mirror before live ERP reads.
    pub prefer_cache: bool,
    /// Freshness window for staged record sets.
    pub cache_ttl_secs: i64,
    /// Treat a fetch timeout like a missing document type (zero rows)
    /// instead of failing the whole call.
    pub tolerate_timeouts: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            prefixes: MaterialPrefixes::default(),
            purchase_bill_type: "RKD01_SYS".to_string(),
            subcontract_bill_type: "RKD03_SYS".to_string(),
            prefer_cache: false,
            cache_ttl_secs: 300,
            tolerate_timeouts: false,
        }
    }
}

impl ReconcileConfig {
    pub fn classify_code(&self, code: &str) -> Option<MaterialType> {
        let starts = |prefixes: &[String]| prefixes.iter().any(|p| code.starts_with(p.as_str()));
        if starts(&self.prefixes.finished) {
            Some(MaterialType::Finished)
        } else if starts(&self.prefixes.self_made) {
            Some(MaterialType::SelfMade)
        } else if starts(&self.prefixes.purchased) {
            Some(MaterialType::Purchased)
        } else {
            None
        }
    }

    fn cache_ttl(&self) -> Duration {
        Duration::seconds(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOptions {
    /// Force live ERP reads even when the staging mirror is fresh.
    pub bypass_cache: bool,
}

/// All nine record sets for one MTO, live or staged.
struct SourceSnapshot {
    production_orders: Vec<ProductionOrderRow>,
    bom_lines: Vec<BomLineRow>,
    production_receipts: Vec<ProductionReceiptRow>,
    purchase_orders: Vec<PurchaseOrderRow>,
    purchase_receipts: Vec<PurchaseReceiptRow>,
    subcontract_orders: Vec<SubcontractOrderRow>,
    picking: Vec<PickingRow>,
    deliveries: Vec<DeliveryRow>,
    sales_orders: Vec<SalesOrderRow>,
}

pub struct MtoStatusService {
    cfg: ReconcileConfig,
    staging: Arc<dyn StagingStore>,
    aux_resolver: AuxPropertyResolver,
    sales_orders: SourceReader<SalesOrderRow>,
    production_orders: SourceReader<ProductionOrderRow>,
    bom_lines: SourceReader<BomLineRow>,
    production_receipts: SourceReader<ProductionReceiptRow>,
    purchase_orders: SourceReader<PurchaseOrderRow>,
    purchase_receipts: SourceReader<PurchaseReceiptRow>,
    subcontract_orders: SourceReader<SubcontractOrderRow>,
    picking: SourceReader<PickingRow>,
    deliveries: SourceReader<DeliveryRow>,
}

impl MtoStatusService {
    pub fn new(
        client: Arc<ErpClient>,
        staging: Arc<dyn StagingStore>,
        cfg: ReconcileConfig,
    ) -> Self {
        Self {
            cfg,
            staging,
            aux_resolver: AuxPropertyResolver::new(client.clone()),
            sales_orders: SourceReader::new(client.clone()),
            production_orders: SourceReader::new(client.clone()),
            bom_lines: SourceReader::new(client.clone()),
            production_receipts: SourceReader::new(client.clone()),
            purchase_orders: SourceReader::new(client.clone()),
            purchase_receipts: SourceReader::new(client.clone()),
            subcontract_orders: SourceReader::new(client.clone()),
            picking: SourceReader::new(client.clone()),
            deliveries: SourceReader::new(client),
        }
    }

    /// Reconcile one MTO into its fulfillment status.
    #[instrument(skip(self), fields(mto = %mto))]
    pub async fn get_status(
        &self,
        mto: &str,
        opts: StatusOptions,
    ) -> Result<MtoStatusResponse, ServiceError> {
        if self.cfg.prefer_cache && !opts.bypass_cache {
            if let Some(snap) = self.snapshot_from_staging(mto).await {
                debug!("reconciling from staged snapshot");
                return self.assemble(mto, snap).await;
            }
            debug!("staged snapshot missing or stale, falling back to live reads");
        }
        let snap = self.fetch_live(mto).await?;
        self.assemble(mto, snap).await
    }

    /// Staged read path. Either every record set is present and fresh, or
    /// the whole call falls back to live reads: mixing cached and live
    /// sources within one reconciliation would produce an inconsistent
    /// snapshot.
    async fn snapshot_from_staging(&self, mto: &str) -> Option<SourceSnapshot> {
        Some(SourceSnapshot {
            production_orders: self.staged::<ProductionOrderRow>(mto).await?,
            bom_lines: self.staged::<BomLineRow>(mto).await?,
            production_receipts: self.staged::<ProductionReceiptRow>(mto).await?,
            purchase_orders: self.staged::<PurchaseOrderRow>(mto).await?,
            purchase_receipts: self.staged::<PurchaseReceiptRow>(mto).await?,
            subcontract_orders: self.staged::<SubcontractOrderRow>(mto).await?,
            picking: self.staged::<PickingRow>(mto).await?,
            deliveries: self.staged::<DeliveryRow>(mto).await?,
            sales_orders: self.staged::<SalesOrderRow>(mto).await?,
        })
    }

    async fn staged<F: ErpForm>(&self, mto: &str) -> Option<Vec<F>> {
        let set = self.staging.read(F::FORM_ID, mto).await?;
        if !set.is_fresh(self.cfg.cache_ttl()) {
            return None;
        }
        Some(convert_rows::<F>(&set.rows))
    }

    /// Live read path. Production orders anchor the call; the BOM fetch
    /// depends on their bill numbers, and the remaining seven document
    /// types are independent, so all eight run as one concurrent group.
    async fn fetch_live(&self, mto: &str) -> Result<SourceSnapshot, ServiceError> {
        let production_orders = self.production_orders.fetch_by_mto(mto).await?;
        if production_orders.is_empty() {
            return Err(ServiceError::MtoNotFound(mto.to_string()));
        }

        let mut bill_nos: Vec<String> = Vec::new();
        for row in &production_orders {
            if !row.bill_no.is_empty() && !bill_nos.contains(&row.bill_no) {
                bill_nos.push(row.bill_no.clone());
            }
        }

        let (
            bom_lines,
            production_receipts,
            purchase_orders,
            purchase_receipts,
            subcontract_orders,
            picking,
            deliveries,
            sales_orders,
        ) = tokio::try_join!(
            self.bom_lines.fetch_by_bill_nos(&bill_nos),
            self.tolerant(self.production_receipts.fetch_by_mto(mto)),
            self.tolerant(self.purchase_orders.fetch_by_mto(mto)),
            self.tolerant(self.purchase_receipts.fetch_by_mto(mto)),
            self.tolerant(self.subcontract_orders.fetch_by_mto(mto)),
            self.tolerant(self.picking.fetch_by_mto(mto)),
            self.tolerant(self.deliveries.fetch_by_mto(mto)),
            self.tolerant(self.sales_orders.fetch_by_mto(mto)),
        )?;

        Ok(SourceSnapshot {
            production_orders,
            bom_lines,
            production_receipts,
            purchase_orders,
            purchase_receipts,
            subcontract_orders,
            picking,
            deliveries,
            sales_orders,
        })
    }

    /// A timeout on one of the parallel fetches is only tolerable when the
    /// configuration says so; readers already absorb the missing-form case.
    async fn tolerant<T>(
        &self,
        fut: impl Future<Output = Result<Vec<T>, ErpError>>,
    ) -> Result<Vec<T>, ErpError> {
        match fut.await {
            Err(ErpError::Timeout) if self.cfg.tolerate_timeouts => {
                warn!("document fetch timed out, treating as zero rows per configuration");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn assemble(
        &self,
        mto: &str,
        snap: SourceSnapshot,
    ) -> Result<MtoStatusResponse, ServiceError> {
        if snap.production_orders.is_empty() {
            return Err(ServiceError::MtoNotFound(mto.to_string()));
        }

        let rollups = bom_rollup::aggregate(snap.bom_lines);
        let self_made_table = quantity_tables::self_made(&snap.production_receipts);
        let purchased_table = quantity_tables::purchased(
            &snap.purchase_orders,
            &snap.purchase_receipts,
            &self.cfg.purchase_bill_type,
        );
        let subcontract_table = quantity_tables::subcontracted(
            &snap.subcontract_orders,
            &snap.purchase_receipts,
            &self.cfg.subcontract_bill_type,
        );

        // One batched variant lookup over every id seen on BOM entries and
        // purchase-order lines.
        let aux_ids: Vec<i64> = rollups
            .iter()
            .map(BomRollup::aux_id)
            .chain(snap.purchase_orders.iter().map(|row| row.aux_id))
            .collect();
        let aux = self.aux_resolver.resolve(&aux_ids).await?;

        let mut children = self.self_made_pass(&rollups, &self_made_table, &aux);
        children.extend(self.purchased_pass(&snap.purchase_orders, &purchased_table, &aux));
        children.extend(self.subcontracted_pass(&snap.subcontract_orders, &subcontract_table));

        // Picking and delivery aggregates apply to every record, keyed by
        // material code with zero defaults.
        let mut pick_request: HashMap<String, Decimal> = HashMap::new();
        let mut pick_actual: HashMap<String, Decimal> = HashMap::new();
        for row in &snap.picking {
            *pick_request.entry(row.material_code.clone()).or_default() += row.app_qty;
            *pick_actual.entry(row.material_code.clone()).or_default() += row.actual_qty;
        }
        let mut delivered: HashMap<String, Decimal> = HashMap::new();
        for row in &snap.deliveries {
            *delivered.entry(row.material_code.clone()).or_default() += row.real_qty;
        }

        for child in &mut children {
            child.pick_request_qty = lookup(&pick_request, &child.material_code);
            child.pick_actual_qty = lookup(&pick_actual, &child.material_code);
            child.delivered_qty = lookup(&delivered, &child.material_code);
            if child.material_type != MaterialType::SelfMade {
                // Outside the BOM context the picking document is the only
                // picked figure; unpicked stays derived and may go negative
                // on over-pick.
                child.picked_qty = child.pick_actual_qty;
                child.unpicked_qty = child.required_qty - child.picked_qty;
            }
        }

        let parent = build_parent(mto, &snap.production_orders, &snap.sales_orders);
        debug!(children = children.len(), "reconciliation assembled");
        Ok(MtoStatusResponse { parent, children })
    }

    fn material_type_of(&self, rollup: &BomRollup) -> MaterialType {
        MaterialType::from_bom_flag(rollup.material_type_flag())
            .or_else(|| self.cfg.classify_code(rollup.material_code()))
            .unwrap_or(MaterialType::SelfMade)
    }

    /// Self-made records come straight from the aggregated BOM. Grouping
    /// for this type is by material code alone: variant splits collapse,
    /// quantities summing across them.
    fn self_made_pass(
        &self,
        rollups: &[BomRollup],
        table: &TypeQuantities,
        aux: &HashMap<i64, String>,
    ) -> Vec<MaterialStatus> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut merged: Vec<(SummedQtys, &BomRollup)> = Vec::new();
        for rollup in rollups {
            if self.material_type_of(rollup) != MaterialType::SelfMade {
                continue;
            }
            match index.get(rollup.material_code()) {
                Some(&at) => {
                    merged[at].0.merge(&rollup.qty);
                    merged[at].1 = rollup;
                }
                None => {
                    index.insert(rollup.material_code(), merged.len());
                    merged.push((rollup.qty, rollup));
                }
            }
        }

        merged
            .into_iter()
            .map(|(qty, latest)| {
                let code = latest.material_code();
                let order_qty = qty.need;
                let receipt_qty = table.received_qty(code);
                MaterialStatus {
                    material_code: code.to_string(),
                    material_name: latest.material_name().to_string(),
                    specification: latest.specification().to_string(),
                    aux_property: aux_label(aux, latest.aux_id(), latest.aux_text()),
                    material_type: MaterialType::SelfMade,
                    type_label: MaterialType::SelfMade.label().to_string(),
                    required_qty: qty.need,
                    order_qty,
                    receipt_qty,
                    // No source-side remaining field exists for this type.
                    unreceived_qty: order_qty - receipt_qty,
                    picked_qty: qty.picked,
                    unpicked_qty: qty.unpicked,
                    pick_request_qty: Decimal::ZERO,
                    pick_actual_qty: Decimal::ZERO,
                    delivered_qty: Decimal::ZERO,
                    inventory_qty: Decimal::ZERO,
                    receipt_source: table.source.to_string(),
                }
            })
            .collect()
    }

    /// Purchased records are authoritative from the purchase order itself,
    /// independent of any BOM line, aggregated by (material code, variant).
    /// Required equals ordered for this type, and unreceived is the order's
    /// own remaining field.
    fn purchased_pass(
        &self,
        orders: &[PurchaseOrderRow],
        table: &TypeQuantities,
        aux: &HashMap<i64, String>,
    ) -> Vec<MaterialStatus> {
        let mut index: HashMap<(String, i64), usize> = HashMap::new();
        let mut latest: Vec<&PurchaseOrderRow> = Vec::new();
        for row in orders {
            let key = (row.material_code.clone(), row.aux_id);
            match index.get(&key) {
                Some(&at) => latest[at] = row,
                None => {
                    index.insert(key, latest.len());
                    latest.push(row);
                }
            }
        }

        latest
            .into_iter()
            .map(|row| {
                let code = &row.material_code;
                let order_qty = table.order_qty(code);
                MaterialStatus {
                    material_code: code.clone(),
                    material_name: row.material_name.clone(),
                    specification: row.specification.clone(),
                    aux_property: aux_label(aux, row.aux_id, &row.aux_text),
                    material_type: MaterialType::Purchased,
                    type_label: MaterialType::Purchased.label().to_string(),
                    required_qty: order_qty,
                    order_qty,
                    receipt_qty: table.received_qty(code),
                    unreceived_qty: table.remaining_qty(code),
                    picked_qty: Decimal::ZERO,
                    unpicked_qty: Decimal::ZERO,
                    pick_request_qty: Decimal::ZERO,
                    pick_actual_qty: Decimal::ZERO,
                    delivered_qty: Decimal::ZERO,
                    inventory_qty: Decimal::ZERO,
                    receipt_source: table.source.to_string(),
                }
            })
            .collect()
    }

    /// Subcontracted records mirror the purchased pass, sourced from
    /// subcontracting orders, with no variant split for this type.
    fn subcontracted_pass(
        &self,
        orders: &[SubcontractOrderRow],
        table: &TypeQuantities,
    ) -> Vec<MaterialStatus> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut latest: Vec<&SubcontractOrderRow> = Vec::new();
        for row in orders {
            match index.get(row.material_code.as_str()) {
                Some(&at) => latest[at] = row,
                None => {
                    index.insert(row.material_code.clone(), latest.len());
                    latest.push(row);
                }
            }
        }

        latest
            .into_iter()
            .map(|row| {
                let code = &row.material_code;
                let order_qty = table.order_qty(code);
                MaterialStatus {
                    material_code: code.clone(),
                    material_name: row.material_name.clone(),
                    specification: row.specification.clone(),
                    aux_property: String::new(),
                    material_type: MaterialType::Subcontracted,
                    type_label: MaterialType::Subcontracted.label().to_string(),
                    required_qty: order_qty,
                    order_qty,
                    receipt_qty: table.received_qty(code),
                    unreceived_qty: table.remaining_qty(code),
                    picked_qty: Decimal::ZERO,
                    unpicked_qty: Decimal::ZERO,
                    pick_request_qty: Decimal::ZERO,
                    pick_actual_qty: Decimal::ZERO,
                    delivered_qty: Decimal::ZERO,
                    inventory_qty: Decimal::ZERO,
                    receipt_source: table.source.to_string(),
                }
            })
            .collect()
    }
}

fn lookup(map: &HashMap<String, Decimal>, code: &str) -> Decimal {
    map.get(code).copied().unwrap_or_default()
}

fn aux_label(aux: &HashMap<i64, String>, id: i64, inline: &str) -> String {
    if id != 0 {
        if let Some(desc) = aux.get(&id) {
            return desc.clone();
        }
    }
    inline.to_string()
}

fn build_parent(
    mto: &str,
    production_orders: &[ProductionOrderRow],
    sales_orders: &[SalesOrderRow],
) -> ParentRecord {
    let po = &production_orders[0];
    let so = sales_orders.first();
    ParentRecord {
        mto_no: mto.to_string(),
        bill_no: po.bill_no.clone(),
        material_code: po.material_code.clone(),
        material_name: po.material_name.clone(),
        specification: po.specification.clone(),
        order_qty: po.qty,
        customer: so.map(|s| s.customer.clone()).unwrap_or_default(),
        delivery_date: so.and_then(|s| s.delivery_date.clone()),
    }
}
