use crate::api::CatalogApi;
use crate::attribute::AttributeSchemaLoader;
use crate::category::CategoryResolver;
use crate::config::Config;
use crate::error::CatalogError;
use crate::listing::{ProductQuery, ProductQueryPipeline};
use crate::seo::{HeadDocument, SeoEmitter};
use actix::prelude::*;
use actix_broker::BrokerIssue;
use serde::Serialize;
use std::sync::Arc;
use storefront_types::attribute::CategoryAttribute;
use storefront_types::category::Category;
use storefront_types::filter::{ActiveFilters, FilterChange};
use storefront_types::listing::{PaginationCursor, ProductListing};
use storefront_types::normalize_path;
use tokio::sync::watch;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CategoryState {
    Idle,
    Loading { path: String },
    Resolved(Category),
    NotFound { path: String },
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ListingStatus {
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// What the page shows for a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    NotFound,
    /// Non-leaf category: child links instead of products.
    Categories,
    Empty,
    Products,
    Errored,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub category: CategoryState,
    pub attributes: Vec<CategoryAttribute>,
    pub attributes_loading: bool,
    pub filters: ActiveFilters,
    pub cursor: PaginationCursor,
    pub status: ListingStatus,
    pub listing: ProductListing,
}

impl CatalogSnapshot {
    pub fn new(page_size: u32) -> Self {
        let cursor = PaginationCursor::new(page_size);
        Self {
            category: CategoryState::Idle,
            attributes: vec![],
            attributes_loading: false,
            filters: ActiveFilters::new(),
            cursor,
            status: ListingStatus::Idle,
            listing: ProductListing::empty(&cursor),
        }
    }

    pub fn category(&self) -> Option<&Category> {
        match &self.category {
            CategoryState::Resolved(category) => Some(category),
            _ => None,
        }
    }

    /// No request of the current view is outstanding.
    pub fn is_settled(&self) -> bool {
        match &self.category {
            CategoryState::Idle | CategoryState::Loading { .. } => false,
            CategoryState::NotFound { .. } => true,
            CategoryState::Resolved(_) => {
                matches!(self.status, ListingStatus::Loaded | ListingStatus::Errored)
                    && !self.attributes_loading
            }
        }
    }

    pub fn view_status(&self) -> ViewStatus {
        match &self.category {
            CategoryState::Idle | CategoryState::Loading { .. } => ViewStatus::Loading,
            CategoryState::NotFound { .. } => ViewStatus::NotFound,
            CategoryState::Resolved(category) if !category.is_leaf => ViewStatus::Categories,
            CategoryState::Resolved(_) => match self.status {
                ListingStatus::Idle | ListingStatus::Loading => ViewStatus::Loading,
                ListingStatus::Errored => ViewStatus::Errored,
                ListingStatus::Loaded if self.listing.is_empty() => ViewStatus::Empty,
                ListingStatus::Loaded => ViewStatus::Products,
            },
        }
    }
}

/// Latest-wins slot for one asynchronous concern.
#[derive(Default)]
struct InFlight {
    generation: u64,
    handle: Option<SpawnHandle>,
}

impl InFlight {
    /// Cancels the running future and returns the generation of its successor.
    fn supersede(&mut self, ctx: &mut Context<CatalogView>) -> u64 {
        if let Some(handle) = self.handle.take() {
            if ctx.cancel_future(handle) {
                log::debug!("Superseded request of generation {}", self.generation);
            }
        }
        self.generation += 1;
        self.generation
    }

    fn track(&mut self, handle: SpawnHandle) {
        self.handle = Some(handle);
    }

    fn complete(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            log::debug!(
                "Dropping stale response of generation {generation}, current {}",
                self.generation
            );
            return false;
        }
        self.handle = None;
        true
    }
}

/// Listing view of one category page.
pub struct CatalogView {
    resolver: CategoryResolver,
    schema: AttributeSchemaLoader,
    pipeline: ProductQueryPipeline,
    seo: SeoEmitter,
    state: CatalogSnapshot,
    state_tx: watch::Sender<CatalogSnapshot>,
    head_tx: watch::Sender<HeadDocument>,
    navigation: InFlight,
    attributes: InFlight,
    listing: InFlight,
    last_query: Option<ProductQuery>,
}

impl CatalogView {
    pub fn new(api: Arc<dyn CatalogApi>, config: &Config) -> Self {
        let state = CatalogSnapshot::new(config.page_size);
        let (state_tx, _) = watch::channel(state.clone());
        let (head_tx, _) = watch::channel(HeadDocument::default());
        Self {
            resolver: CategoryResolver::new(api.clone()),
            schema: AttributeSchemaLoader::new(api.clone()),
            pipeline: ProductQueryPipeline::new(api, config.locale.clone()),
            seo: SeoEmitter::from_config(config),
            state,
            state_tx,
            head_tx,
            navigation: InFlight::default(),
            attributes: InFlight::default(),
            listing: InFlight::default(),
            last_query: None,
        }
    }

    fn publish(&mut self) {
        let seo = &self.seo;
        let state = &self.state;
        self.head_tx.send_if_modified(|head| seo.apply(head, state));
        self.state_tx.send_replace(self.state.clone());
    }

    fn loading_path(&self) -> String {
        match &self.state.category {
            CategoryState::Loading { path } | CategoryState::NotFound { path } => path.clone(),
            CategoryState::Resolved(category) => category.path.clone(),
            CategoryState::Idle => String::new(),
        }
    }

    fn on_category_resolved(
        &mut self,
        res: Result<Category, CatalogError>,
        ctx: &mut Context<Self>,
    ) {
        match res {
            Ok(category) => {
                log::debug!("Resolved category {:?}", category.path);
                self.state.category = CategoryState::Resolved(category);
                self.load_attributes(ctx);
                self.refresh_listing(ctx);
            }
            Err(err) => {
                let path = match err {
                    CatalogError::NotFound { path } => path,
                    err => {
                        log::error!("Unable to resolve category: {err}");
                        self.loading_path()
                    }
                };
                self.state.category = CategoryState::NotFound { path };
                self.state.status = ListingStatus::Idle;
                self.state.listing = ProductListing::empty(&self.state.cursor);
                self.publish();
            }
        }
    }

    fn load_attributes(&mut self, ctx: &mut Context<Self>) {
        let generation = self.attributes.supersede(ctx);
        self.state.attributes.clear();
        let Some(category) = self
            .state
            .category()
            .filter(|c| c.accepts_filters())
            .cloned()
        else {
            self.state.attributes_loading = false;
            return;
        };
        self.state.attributes_loading = true;
        let loader = self.schema.clone();
        let handle = ctx.spawn(
            async move { loader.load_filters(&category).await }
                .into_actor(self)
                .map(move |attributes, act, _| {
                    if !act.attributes.complete(generation) {
                        return;
                    }
                    act.state.attributes = attributes;
                    act.state.attributes_loading = false;
                    act.publish();
                }),
        );
        self.attributes.track(handle);
    }

    /// Recomputes the listing from the current category, cursor and filters.
    fn refresh_listing(&mut self, ctx: &mut Context<Self>) {
        let Some(category) = self.state.category() else {
            self.publish();
            return;
        };
        let plan = ProductQuery::plan(category, &self.state.cursor, &self.state.filters);
        let Some(query) = plan else {
            self.listing.supersede(ctx);
            self.last_query = None;
            self.state.status = ListingStatus::Loaded;
            self.state.listing = ProductListing::empty(&self.state.cursor);
            self.publish();
            self.issue_settled();
            return;
        };
        if self.last_query.as_ref() == Some(&query) && self.state.status != ListingStatus::Errored
        {
            log::debug!("Query {query:?} already issued");
            self.publish();
            return;
        }

        let generation = self.listing.supersede(ctx);
        self.last_query = Some(query.clone());
        self.state.status = ListingStatus::Loading;
        self.publish();

        let pipeline = self.pipeline.clone();
        let handle = ctx.spawn(
            async move { pipeline.execute(query).await }
                .into_actor(self)
                .map(move |res, act, _| {
                    if !act.listing.complete(generation) {
                        return;
                    }
                    match res {
                        Ok(listing) => {
                            act.state.listing = listing;
                            act.state.status = ListingStatus::Loaded;
                        }
                        Err(err) => {
                            log::error!("{err}");
                            act.state.listing = ProductListing::empty(&act.state.cursor);
                            act.state.status = ListingStatus::Errored;
                        }
                    }
                    act.publish();
                    act.issue_settled();
                }),
        );
        self.listing.track(handle);
    }

    fn issue_settled(&self) {
        self.issue_system_async(ListingSettled {
            category_path: self.loading_path(),
            status: self.state.status,
            total: self.state.listing.total,
        });
    }
}

impl Actor for CatalogView {
    type Context = Context<Self>;
}

/// Switches the view to another category path.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct Navigate(pub String);

/// Requests another page of the current listing.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<(), CatalogError>")]
pub struct ChangePage(pub u32);

/// Applies filter edits and recomputes once. Responds whether the filters changed.
#[derive(Message, Clone, Debug)]
#[rtype(result = "bool")]
pub struct UpdateFilters(pub Vec<FilterChange>);

/// Re-issues the current listing query.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct Reload;

#[derive(Message)]
#[rtype(result = "CatalogSubscription")]
pub struct Subscribe;

pub struct CatalogSubscription {
    pub state: watch::Receiver<CatalogSnapshot>,
    pub head: watch::Receiver<HeadDocument>,
}

#[derive(Message)]
#[rtype(result = "CatalogSnapshot")]
pub struct GetSnapshot;

#[derive(Message)]
#[rtype(result = "HeadDocument")]
pub struct GetHead;

#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct ScrollToTop {
    pub page: u32,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct ListingSettled {
    pub category_path: String,
    pub status: ListingStatus,
    pub total: u64,
}

impl Handler<Navigate> for CatalogView {
    type Result = ();

    fn handle(&mut self, Navigate(path): Navigate, ctx: &mut Self::Context) -> Self::Result {
        let path = normalize_path(path);
        let generation = self.navigation.supersede(ctx);
        self.attributes.supersede(ctx);
        self.listing.supersede(ctx);
        self.last_query = None;

        self.state.category = CategoryState::Loading { path: path.clone() };
        self.state.attributes.clear();
        self.state.attributes_loading = false;
        self.state.filters.clear_all();
        self.state.cursor.reset();
        self.state.status = ListingStatus::Loading;
        self.state.listing = ProductListing::empty(&self.state.cursor);
        self.publish();

        let resolver = self.resolver.clone();
        let handle = ctx.spawn(
            async move { resolver.resolve(&path).await }
                .into_actor(self)
                .map(move |res, act, ctx| {
                    if act.navigation.complete(generation) {
                        act.on_category_resolved(res, ctx);
                    }
                }),
        );
        self.navigation.track(handle);
    }
}

impl Handler<ChangePage> for CatalogView {
    type Result = Result<(), CatalogError>;

    fn handle(&mut self, ChangePage(page): ChangePage, ctx: &mut Self::Context) -> Self::Result {
        let total_pages = self.state.listing.total_pages;
        if !self.state.cursor.accepts(page, total_pages) {
            log::debug!("Ignoring page {page} outside 1..={total_pages}");
            return Err(CatalogError::ValidationRejected { page, total_pages });
        }
        if page == self.state.cursor.current_page {
            return Ok(());
        }
        self.state.cursor.current_page = page;
        self.issue_system_async(ScrollToTop { page });
        self.refresh_listing(ctx);
        Ok(())
    }
}

impl Handler<UpdateFilters> for CatalogView {
    type Result = bool;

    fn handle(
        &mut self,
        UpdateFilters(changes): UpdateFilters,
        ctx: &mut Self::Context,
    ) -> Self::Result {
        let before = self.state.filters.clone();
        for change in &changes {
            self.state.filters.apply(change);
        }
        let changed = before != self.state.filters;
        if changed {
            self.state.cursor.reset();
            // Page count of the previous filter set no longer bounds `ChangePage`.
            self.state.listing = ProductListing::empty(&self.state.cursor);
            self.refresh_listing(ctx);
        }
        changed
    }
}

impl Handler<Reload> for CatalogView {
    type Result = ();

    fn handle(&mut self, _: Reload, ctx: &mut Self::Context) -> Self::Result {
        self.last_query = None;
        self.refresh_listing(ctx);
    }
}

impl Handler<Subscribe> for CatalogView {
    type Result = MessageResult<Subscribe>;

    fn handle(&mut self, _: Subscribe, _: &mut Self::Context) -> Self::Result {
        MessageResult(CatalogSubscription {
            state: self.state_tx.subscribe(),
            head: self.head_tx.subscribe(),
        })
    }
}

impl Handler<GetSnapshot> for CatalogView {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _: GetSnapshot, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.state.clone())
    }
}

impl Handler<GetHead> for CatalogView {
    type Result = MessageResult<GetHead>;

    fn handle(&mut self, _: GetHead, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.head_tx.borrow().clone())
    }
}
