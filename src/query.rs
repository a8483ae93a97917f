//! List-query statement building
//!
//! Translates a [`ListParams`] bundle (free-text search, date range, sort,
//! pagination) plus a resource's configuration into `sea-query` SELECT
//! statements. The functions here are pure: they produce statements, the
//! store executes them, and tests assert on the generated SQL directly.

use crate::descriptor::{Filter, FilterOperator, FilterValue, SortDirection};
use crate::error::{AdminError, AdminResult};
use crate::registry::RegisteredResource;
use crate::store::Record;
use sea_query::{Alias, Cond, Condition, Expr, Func, Order, Query, SelectStatement, SimpleExpr};

/// Alias under which count queries return their single value
pub const COUNT_COLUMN: &str = "count";

/// Caller-supplied list parameters
#[derive(Debug, Clone)]
pub struct ListParams {
	/// Free-text search term; blank means no search predicate at all
	pub search: String,
	/// Inclusive lower bound for the date-range filter
	pub from_date: Option<String>,
	/// Inclusive upper bound for the date-range filter
	pub to_date: Option<String>,
	/// Requested sort criteria; invalid fields are dropped
	pub sort: Vec<crate::descriptor::SortCriterion>,
	/// 1-based page number
	pub page: u64,
	/// Page size; `None` disables pagination (used by CSV export)
	pub page_size: Option<u64>,
}

impl Default for ListParams {
	fn default() -> Self {
		Self {
			search: String::new(),
			from_date: None,
			to_date: None,
			sort: Vec::new(),
			page: 1,
			page_size: None,
		}
	}
}

/// One page of list results
#[derive(Debug, Clone)]
pub struct Page {
	/// Records of this page, in query order
	pub items: Vec<Record>,
	/// Total matching records across all pages
	pub total: u64,
	/// 1-based page number
	pub page: u64,
	/// Page size the query ran with, `None` when unpaginated
	pub per_page: Option<u64>,
	/// Total page count (1 when unpaginated)
	pub pages: u64,
}

impl Page {
	/// Assemble a page from query results
	pub fn new(items: Vec<Record>, total: u64, page: u64, per_page: Option<u64>) -> Self {
		let pages = match per_page {
			Some(size) if size > 0 => total.div_ceil(size).max(1),
			_ => 1,
		};
		Self {
			items,
			total,
			page,
			per_page,
			pages,
		}
	}
}

/// Escape LIKE metacharacters in a search term.
///
/// Without this, a user searching for `50%` would match every row.
pub fn escape_like(term: &str) -> String {
	term.replace('\\', "\\\\")
		.replace('%', "\\%")
		.replace('_', "\\_")
}

/// Build the paged SELECT for a list view
pub fn build_select(entry: &RegisteredResource, params: &ListParams) -> AdminResult<SelectStatement> {
	let mut query = base_query(entry, true)?;

	if let Some(condition) = filter_condition(entry, params)? {
		query.cond_where(condition);
	}

	apply_sort(&mut query, entry, params);

	if let Some(size) = params.page_size {
		let page = params.page.max(1);
		query.limit(size).offset((page - 1) * size);
	}

	Ok(query)
}

/// Build the companion COUNT(*) query for the same filters
pub fn build_count(entry: &RegisteredResource, params: &ListParams) -> AdminResult<SelectStatement> {
	let mut query = base_query(entry, false)?;
	query.expr_as(Expr::asterisk().count(), Alias::new(COUNT_COLUMN));

	if let Some(condition) = filter_condition(entry, params)? {
		query.cond_where(condition);
	}

	Ok(query)
}

/// FROM clause plus joins; with `with_columns`, also the select list:
/// every base-table column qualified, plus joined columns aliased under
/// their dotted display name.
fn base_query(entry: &RegisteredResource, with_columns: bool) -> AdminResult<SelectStatement> {
	let table = Alias::new(entry.descriptor.table());
	let mut query = Query::select();
	query.from(table.clone());

	if with_columns {
		for field in &entry.schema.fields {
			query.column((table.clone(), Alias::new(&field.name)));
		}
		for display in entry.descriptor.list_display() {
			if let Some((relation, field)) = display.split_once('.') {
				let spec = entry.descriptor.relation(relation).ok_or_else(|| {
					AdminError::Config(format!("undeclared relation '{relation}'"))
				})?;
				query.expr_as(
					Expr::col((Alias::new(&spec.table), Alias::new(field))),
					Alias::new(display.as_str()),
				);
			}
		}
	}

	for spec in entry.descriptor.relations() {
		query.left_join(
			Alias::new(&spec.table),
			Expr::col((table.clone(), Alias::new(&spec.local_key)))
				.equals((Alias::new(&spec.table), Alias::new(&spec.foreign_key))),
		);
	}

	Ok(query)
}

/// Combined WHERE condition: search OR-group, date range, and the
/// descriptor's extra filters, all ANDed. `None` when nothing applies.
fn filter_condition(
	entry: &RegisteredResource,
	params: &ListParams,
) -> AdminResult<Option<Condition>> {
	let mut condition = Cond::all();
	let mut any_predicate = false;

	let term = params.search.trim();
	if !term.is_empty() {
		let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
		let mut search = Cond::any();
		let mut matched = false;
		for display in entry.descriptor.list_display() {
			let column = match display.split_once('.') {
				Some((relation, field)) => {
					let spec = entry.descriptor.relation(relation).ok_or_else(|| {
						AdminError::Config(format!("undeclared relation '{relation}'"))
					})?;
					(Alias::new(&spec.table), Alias::new(field))
				}
				None => {
					// Display entries not backed by a real column cannot be searched
					if !entry.schema.has_field(display) {
						continue;
					}
					(Alias::new(entry.descriptor.table()), Alias::new(display.as_str()))
				}
			};
			search = search.add(text_contains(Expr::col(column), &pattern));
			matched = true;
		}
		if matched {
			condition = condition.add(search);
			any_predicate = true;
		} else {
			// Nothing searchable: the term is ignored and the list widens
			tracing::debug!(
				resource = entry.descriptor.identifier(),
				"no searchable display field; search term dropped"
			);
		}
	}

	let date_column = (
		Alias::new(entry.descriptor.table()),
		Alias::new(entry.descriptor.date_field()),
	);
	if entry.schema.has_field(entry.descriptor.date_field()) {
		if let Some(from) = &params.from_date {
			condition = condition.add(
				Expr::expr(Expr::col(date_column.clone()).cast_as(Alias::new("DATE")))
					.gte(from.as_str()),
			);
			any_predicate = true;
		}
		if let Some(to) = &params.to_date {
			condition = condition.add(
				Expr::expr(Expr::col(date_column.clone()).cast_as(Alias::new("DATE")))
					.lte(to.as_str()),
			);
			any_predicate = true;
		}
	}

	for filter in entry.descriptor.extra_filters() {
		condition = condition.add(extra_filter_expr(entry, filter));
		any_predicate = true;
	}

	Ok(any_predicate.then_some(condition))
}

/// Case-insensitive substring predicate: `LOWER(CAST(col AS TEXT)) LIKE p`
fn text_contains(column: Expr, pattern: &str) -> SimpleExpr {
	Expr::expr(Func::lower(column.cast_as(Alias::new("TEXT")))).like(pattern)
}

fn extra_filter_expr(entry: &RegisteredResource, filter: &Filter) -> SimpleExpr {
	let column = (
		Alias::new(entry.descriptor.table()),
		Alias::new(&filter.field),
	);
	match (&filter.operator, &filter.value) {
		(FilterOperator::Eq, value) => Expr::col(column).eq(filter_value(value)),
		(FilterOperator::Ne, value) => Expr::col(column).ne(filter_value(value)),
		(FilterOperator::Contains, FilterValue::String(s)) => {
			let pattern = format!("%{}%", escape_like(&s.to_lowercase()));
			text_contains(Expr::col(column), &pattern)
		}
		(FilterOperator::Contains, value) => Expr::col(column).eq(filter_value(value)),
		(FilterOperator::In, FilterValue::List(items)) => {
			Expr::col(column).is_in(items.iter().map(String::as_str))
		}
		(FilterOperator::In, value) => Expr::col(column).eq(filter_value(value)),
		(FilterOperator::IsNotNull, _) => Expr::col(column).is_not_null(),
	}
}

fn filter_value(value: &FilterValue) -> sea_query::Value {
	match value {
		FilterValue::String(s) => s.as_str().into(),
		FilterValue::Integer(i) => (*i).into(),
		FilterValue::Boolean(b) => (*b).into(),
		FilterValue::List(items) => items.join(",").into(),
		FilterValue::None => sea_query::Value::String(None),
	}
}

/// Requested criteria first, then descriptor defaults; fields missing from
/// the schema are dropped. With nothing valid left, fall back to primary
/// key ascending so pagination stays deterministic.
fn apply_sort(query: &mut SelectStatement, entry: &RegisteredResource, params: &ListParams) {
	let table = Alias::new(entry.descriptor.table());
	let criteria = if params.sort.is_empty() {
		entry.descriptor.sort()
	} else {
		&params.sort
	};

	let mut applied = false;
	for criterion in criteria {
		if !entry.schema.has_field(&criterion.field) {
			continue;
		}
		let order = match criterion.direction {
			SortDirection::Asc => Order::Asc,
			SortDirection::Desc => Order::Desc,
		};
		query.order_by((table.clone(), Alias::new(&criterion.field)), order);
		applied = true;
	}

	if !applied {
		if let Some(pk) = entry.schema.primary_key() {
			query.order_by((table.clone(), Alias::new(&pk.name)), Order::Asc);
		}
	}
}
