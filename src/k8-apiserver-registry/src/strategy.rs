//!
//! # Strategy capability model
//!
//! A strategy customizes how a store creates, updates and renders objects.
//! Each capability is optional: a strategy exposes it by returning itself
//! from the matching accessor. Accessors are resolved once, when the store
//! is built, and the results are held by a [`StrategyProfile`].
//!
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use k8_apiserver_types::table::Table;
use k8_apiserver_types::FieldErrorList;

use crate::table::default_table;
use crate::ObjectHooks;
use crate::RequestContext;
use crate::Resource;
use crate::StatusSubResource;
use crate::StoreError;

/// fill unset fields on decode
pub trait Defaulter<T>: Send + Sync {
    fn default(&self, obj: &mut T);
}

pub trait Validater<T>: Send + Sync {
    fn validate(&self, ctx: &RequestContext, obj: &T) -> FieldErrorList;
}

pub trait ValidateUpdater<T>: Send + Sync {
    fn validate_update(&self, ctx: &RequestContext, obj: &T, old: &T) -> FieldErrorList;
}

/// mutate object right before it is persisted, cannot fail
pub trait PrepareForCreater<T>: Send + Sync {
    fn prepare_for_create(&self, ctx: &RequestContext, obj: &mut T);
}

pub trait PrepareForUpdater<T>: Send + Sync {
    fn prepare_for_update(&self, ctx: &RequestContext, obj: &mut T, old: &T);
}

/// normalize format before persistence, must be idempotent
pub trait Canonicalizer<T>: Send + Sync {
    fn canonicalize(&self, obj: &mut T);
}

pub trait AllowCreateOnUpdater: Send + Sync {
    fn allow_create_on_update(&self) -> bool;
}

pub trait AllowUnconditionalUpdater: Send + Sync {
    fn allow_unconditional_update(&self) -> bool;
}

pub trait TableConverter<T>: Send + Sync {
    fn convert_to_table(&self, objects: &[T]) -> Result<Table, StoreError>;
}

pub trait Strategy<T: Resource>: Send + Sync + 'static {
    fn defaulter(self: Arc<Self>) -> Option<Arc<dyn Defaulter<T>>> {
        None
    }

    fn validater(self: Arc<Self>) -> Option<Arc<dyn Validater<T>>> {
        None
    }

    fn validate_updater(self: Arc<Self>) -> Option<Arc<dyn ValidateUpdater<T>>> {
        None
    }

    fn prepare_for_creater(self: Arc<Self>) -> Option<Arc<dyn PrepareForCreater<T>>> {
        None
    }

    fn prepare_for_updater(self: Arc<Self>) -> Option<Arc<dyn PrepareForUpdater<T>>> {
        None
    }

    fn canonicalizer(self: Arc<Self>) -> Option<Arc<dyn Canonicalizer<T>>> {
        None
    }

    fn create_on_update(self: Arc<Self>) -> Option<Arc<dyn AllowCreateOnUpdater>> {
        None
    }

    fn unconditional_update(self: Arc<Self>) -> Option<Arc<dyn AllowUnconditionalUpdater>> {
        None
    }

    fn table_converter(self: Arc<Self>) -> Option<Arc<dyn TableConverter<T>>> {
        None
    }
}

/// capabilities a strategy exposes, with the update policies already resolved
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub defaulter: bool,
    pub validater: bool,
    pub validate_updater: bool,
    pub prepare_for_creater: bool,
    pub prepare_for_updater: bool,
    pub canonicalizer: bool,
    pub table_converter: bool,
    pub allow_create_on_update: bool,
    pub allow_unconditional_update: bool,
}

/// Strategy bound to a store. Every accessor is resolved once, here; requests
/// only consult the resolved capability objects.
pub struct StrategyProfile<T: Resource> {
    defaulter: Option<Arc<dyn Defaulter<T>>>,
    validater: Option<Arc<dyn Validater<T>>>,
    validate_updater: Option<Arc<dyn ValidateUpdater<T>>>,
    prepare_for_creater: Option<Arc<dyn PrepareForCreater<T>>>,
    prepare_for_updater: Option<Arc<dyn PrepareForUpdater<T>>>,
    canonicalizer: Option<Arc<dyn Canonicalizer<T>>>,
    table_converter: Option<Arc<dyn TableConverter<T>>>,
    capabilities: Capabilities,
}

impl<T: Resource> Clone for StrategyProfile<T> {
    fn clone(&self) -> Self {
        Self {
            defaulter: self.defaulter.clone(),
            validater: self.validater.clone(),
            validate_updater: self.validate_updater.clone(),
            prepare_for_creater: self.prepare_for_creater.clone(),
            prepare_for_updater: self.prepare_for_updater.clone(),
            canonicalizer: self.canonicalizer.clone(),
            table_converter: self.table_converter.clone(),
            capabilities: self.capabilities,
        }
    }
}

impl<T: Resource> fmt::Debug for StrategyProfile<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StrategyProfile<{}>({:?})", T::kind(), self.capabilities)
    }
}

impl<T: Resource> StrategyProfile<T> {
    pub fn new(strategy: Arc<dyn Strategy<T>>) -> Self {
        let allow_create_on_update = strategy
            .clone()
            .create_on_update()
            .map(|policy| policy.allow_create_on_update())
            .unwrap_or(false);
        let allow_unconditional_update = strategy
            .clone()
            .unconditional_update()
            .map(|policy| policy.allow_unconditional_update())
            .unwrap_or(false);

        let mut profile = Self {
            defaulter: strategy.clone().defaulter(),
            validater: strategy.clone().validater(),
            validate_updater: strategy.clone().validate_updater(),
            prepare_for_creater: strategy.clone().prepare_for_creater(),
            prepare_for_updater: strategy.clone().prepare_for_updater(),
            canonicalizer: strategy.clone().canonicalizer(),
            table_converter: strategy.table_converter(),
            capabilities: Capabilities {
                allow_create_on_update,
                allow_unconditional_update,
                ..Default::default()
            },
        };
        profile.capabilities.defaulter = profile.defaulter.is_some();
        profile.capabilities.validater = profile.validater.is_some();
        profile.capabilities.validate_updater = profile.validate_updater.is_some();
        profile.capabilities.prepare_for_creater = profile.prepare_for_creater.is_some();
        profile.capabilities.prepare_for_updater = profile.prepare_for_updater.is_some();
        profile.capabilities.canonicalizer = profile.canonicalizer.is_some();
        profile.capabilities.table_converter = profile.table_converter.is_some();
        debug!(kind = T::kind(), capabilities = ?profile.capabilities, "strategy resolved");
        profile
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn default(&self, obj: &mut T) {
        if let Some(defaulter) = &self.defaulter {
            defaulter.default(obj);
        }
    }

    pub fn validate(&self, ctx: &RequestContext, obj: &T) -> FieldErrorList {
        self.validater
            .as_ref()
            .map(|v| v.validate(ctx, obj))
            .unwrap_or_default()
    }

    pub fn validate_update(&self, ctx: &RequestContext, obj: &T, old: &T) -> FieldErrorList {
        self.validate_updater
            .as_ref()
            .map(|v| v.validate_update(ctx, obj, old))
            .unwrap_or_default()
    }

    pub fn prepare_for_create(&self, ctx: &RequestContext, obj: &mut T) {
        if let Some(prepare) = &self.prepare_for_creater {
            prepare.prepare_for_create(ctx, obj);
        }
    }

    pub fn prepare_for_update(&self, ctx: &RequestContext, obj: &mut T, old: &T) {
        if let Some(prepare) = &self.prepare_for_updater {
            prepare.prepare_for_update(ctx, obj, old);
        }
    }

    pub fn canonicalize(&self, obj: &mut T) {
        if let Some(canonicalizer) = &self.canonicalizer {
            canonicalizer.canonicalize(obj);
        }
    }

    pub fn allow_create_on_update(&self) -> bool {
        self.capabilities.allow_create_on_update
    }

    pub fn allow_unconditional_update(&self) -> bool {
        self.capabilities.allow_unconditional_update
    }

    pub fn convert_to_table(&self, objects: &[T]) -> Result<Table, StoreError> {
        match &self.table_converter {
            Some(converter) => converter.convert_to_table(objects),
            None => Ok(default_table(objects)),
        }
    }
}

/// Strategy delegating to the hooks a resource implements on itself.
/// Object defaulting is registered with the scheme, not repeated here.
pub struct DefaultStrategy<T> {
    hooks: ObjectHooks<T>,
}

impl<T: Resource> DefaultStrategy<T> {
    pub fn new() -> Self {
        Self { hooks: T::hooks() }
    }
}

impl<T: Resource> Default for DefaultStrategy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> Strategy<T> for DefaultStrategy<T> {
    fn validater(self: Arc<Self>) -> Option<Arc<dyn Validater<T>>> {
        match self.hooks.validate {
            Some(_) => Some(self),
            None => None,
        }
    }

    fn validate_updater(self: Arc<Self>) -> Option<Arc<dyn ValidateUpdater<T>>> {
        match self.hooks.validate_update {
            Some(_) => Some(self),
            None => None,
        }
    }

    fn prepare_for_creater(self: Arc<Self>) -> Option<Arc<dyn PrepareForCreater<T>>> {
        match self.hooks.prepare_for_create {
            Some(_) => Some(self),
            None => None,
        }
    }

    fn prepare_for_updater(self: Arc<Self>) -> Option<Arc<dyn PrepareForUpdater<T>>> {
        match self.hooks.prepare_for_update {
            Some(_) => Some(self),
            None => None,
        }
    }

    fn canonicalizer(self: Arc<Self>) -> Option<Arc<dyn Canonicalizer<T>>> {
        match self.hooks.canonicalize {
            Some(_) => Some(self),
            None => None,
        }
    }
}

impl<T: Resource> Validater<T> for DefaultStrategy<T> {
    fn validate(&self, _ctx: &RequestContext, obj: &T) -> FieldErrorList {
        self.hooks.validate.map(|f| f(obj)).unwrap_or_default()
    }
}

impl<T: Resource> ValidateUpdater<T> for DefaultStrategy<T> {
    fn validate_update(&self, _ctx: &RequestContext, obj: &T, old: &T) -> FieldErrorList {
        self.hooks
            .validate_update
            .map(|f| f(obj, old))
            .unwrap_or_default()
    }
}

impl<T: Resource> PrepareForCreater<T> for DefaultStrategy<T> {
    fn prepare_for_create(&self, _ctx: &RequestContext, obj: &mut T) {
        if let Some(prepare) = self.hooks.prepare_for_create {
            prepare(obj);
        }
    }
}

impl<T: Resource> PrepareForUpdater<T> for DefaultStrategy<T> {
    fn prepare_for_update(&self, _ctx: &RequestContext, obj: &mut T, old: &T) {
        if let Some(prepare) = self.hooks.prepare_for_update {
            prepare(obj, old);
        }
    }
}

impl<T: Resource> Canonicalizer<T> for DefaultStrategy<T> {
    fn canonicalize(&self, obj: &mut T) {
        if let Some(canonicalize) = self.hooks.canonicalize {
            canonicalize(obj);
        }
    }
}

/// half of a status-split object an endpoint may change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Spec,
    Status,
}

/// Wraps a base strategy for one endpoint of a resource whose spec and
/// status are written separately. On update the half the endpoint does not
/// own is restored from the stored object before the base hooks run.
pub struct SplitStrategy<T: Resource> {
    base: Arc<dyn Strategy<T>>,
    base_prepare: Option<Arc<dyn PrepareForUpdater<T>>>,
    owns: Half,
}

impl<T: StatusSubResource> SplitStrategy<T> {
    /// main endpoint, updates keep the stored status
    pub fn main_resource(base: Arc<dyn Strategy<T>>) -> Self {
        Self::new(base, Half::Spec)
    }

    /// status subresource, updates keep the stored spec and never create
    pub fn status_subresource(base: Arc<dyn Strategy<T>>) -> Self {
        Self::new(base, Half::Status)
    }

    fn new(base: Arc<dyn Strategy<T>>, owns: Half) -> Self {
        Self {
            base_prepare: base.clone().prepare_for_updater(),
            base,
            owns,
        }
    }

    pub fn owns(&self) -> Half {
        self.owns
    }
}

impl<T: StatusSubResource> Strategy<T> for SplitStrategy<T> {
    fn defaulter(self: Arc<Self>) -> Option<Arc<dyn Defaulter<T>>> {
        self.base.clone().defaulter()
    }

    fn validater(self: Arc<Self>) -> Option<Arc<dyn Validater<T>>> {
        self.base.clone().validater()
    }

    fn validate_updater(self: Arc<Self>) -> Option<Arc<dyn ValidateUpdater<T>>> {
        self.base.clone().validate_updater()
    }

    fn prepare_for_creater(self: Arc<Self>) -> Option<Arc<dyn PrepareForCreater<T>>> {
        self.base.clone().prepare_for_creater()
    }

    fn prepare_for_updater(self: Arc<Self>) -> Option<Arc<dyn PrepareForUpdater<T>>> {
        Some(self)
    }

    fn canonicalizer(self: Arc<Self>) -> Option<Arc<dyn Canonicalizer<T>>> {
        self.base.clone().canonicalizer()
    }

    fn create_on_update(self: Arc<Self>) -> Option<Arc<dyn AllowCreateOnUpdater>> {
        match self.owns {
            Half::Spec => self.base.clone().create_on_update(),
            Half::Status => None,
        }
    }

    fn unconditional_update(self: Arc<Self>) -> Option<Arc<dyn AllowUnconditionalUpdater>> {
        self.base.clone().unconditional_update()
    }

    fn table_converter(self: Arc<Self>) -> Option<Arc<dyn TableConverter<T>>> {
        self.base.clone().table_converter()
    }
}

impl<T: StatusSubResource> PrepareForUpdater<T> for SplitStrategy<T> {
    fn prepare_for_update(&self, ctx: &RequestContext, obj: &mut T, old: &T) {
        match self.owns {
            Half::Spec => obj.copy_status(old),
            Half::Status => obj.copy_spec(old),
        }
        if let Some(prepare) = &self.base_prepare {
            prepare.prepare_for_update(ctx, obj, old);
        }
    }
}

#[cfg(test)]
mod test {

    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use k8_apiserver_types::FieldError;
    use k8_apiserver_types::FieldErrorList;
    use k8_apiserver_types::FieldPath;

    use super::AllowCreateOnUpdater;
    use super::Capabilities;
    use super::DefaultStrategy;
    use super::SplitStrategy;
    use super::Strategy;
    use super::StrategyProfile;
    use super::Validater;
    use crate::fixture::Gadget;
    use crate::fixture::GadgetSpec;
    use crate::fixture::Widget;
    use crate::fixture::WidgetSpec;
    use crate::fixture::WidgetStatus;
    use crate::RequestContext;

    /// rejects everything and counts how often its accessor is resolved
    #[derive(Default)]
    struct RejectAll {
        resolved: AtomicUsize,
    }

    impl Strategy<Gadget> for RejectAll {
        fn validater(self: Arc<Self>) -> Option<Arc<dyn Validater<Gadget>>> {
            self.resolved.fetch_add(1, Ordering::SeqCst);
            Some(self)
        }
    }

    impl Validater<Gadget> for RejectAll {
        fn validate(&self, _ctx: &RequestContext, obj: &Gadget) -> FieldErrorList {
            vec![FieldError::forbidden(
                &FieldPath::new("metadata").child("name"),
                format!("{} is not allowed", obj.metadata.name),
            )]
            .into()
        }
    }

    struct CreateOnUpdate;

    impl Strategy<Widget> for CreateOnUpdate {
        fn create_on_update(self: Arc<Self>) -> Option<Arc<dyn AllowCreateOnUpdater>> {
            Some(self)
        }
    }

    impl AllowCreateOnUpdater for CreateOnUpdate {
        fn allow_create_on_update(&self) -> bool {
            true
        }
    }

    fn widget(size: u32, ready: bool) -> Widget {
        Widget::new(
            "w1",
            WidgetSpec {
                size,
                ..Default::default()
            },
        )
        .set_status(WidgetStatus { ready })
    }

    #[test]
    fn test_default_strategy_capabilities() {
        let profile = StrategyProfile::<Widget>::new(Arc::new(DefaultStrategy::<Widget>::new()));
        let caps = profile.capabilities();
        assert!(caps.validater);
        assert!(caps.canonicalizer);
        assert!(!caps.defaulter);
        assert!(!caps.allow_create_on_update);
        assert!(!caps.allow_unconditional_update);

        let gadget = StrategyProfile::<Gadget>::new(Arc::new(DefaultStrategy::<Gadget>::new()));
        assert_eq!(*gadget.capabilities(), Capabilities::default());
    }

    #[test]
    fn test_missing_validater_accepts() {
        let profile = StrategyProfile::<Gadget>::new(Arc::new(DefaultStrategy::<Gadget>::new()));
        let errors = profile.validate(&RequestContext::new(), &Gadget::default());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_custom_validater_resolved_once() {
        //given
        let strategy = Arc::new(RejectAll::default());
        let profile = StrategyProfile::<Gadget>::new(strategy.clone());

        //when
        let gadget = Gadget::new("g1", GadgetSpec::default());
        for _ in 0..3 {
            let errors = profile.validate(&RequestContext::new(), &gadget);
            assert_eq!(errors.len(), 1);
            assert!(errors.find("metadata.name").is_some());
        }

        //then
        assert_eq!(strategy.resolved.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_strategy_keeps_spec() {
        let base: Arc<dyn Strategy<Widget>> = Arc::new(DefaultStrategy::<Widget>::new());
        let profile = StrategyProfile::<Widget>::new(Arc::new(SplitStrategy::status_subresource(base)));
        assert!(profile.capabilities().prepare_for_updater);
        assert!(profile.capabilities().validater);

        let old = widget(1, false);
        let mut new = widget(5, true);

        profile.prepare_for_update(&RequestContext::new(), &mut new, &old);
        assert_eq!(new.spec.size, 1);
        assert!(new.status.ready);
    }

    #[test]
    fn test_main_strategy_keeps_status() {
        let base: Arc<dyn Strategy<Widget>> = Arc::new(DefaultStrategy::<Widget>::new());
        let profile = StrategyProfile::<Widget>::new(Arc::new(SplitStrategy::main_resource(base)));

        let old = widget(1, false);
        let mut new = widget(5, true);

        profile.prepare_for_update(&RequestContext::new(), &mut new, &old);
        assert_eq!(new.spec.size, 5);
        assert!(!new.status.ready);
    }

    #[test]
    fn test_status_strategy_never_creates() {
        let base: Arc<dyn Strategy<Widget>> = Arc::new(CreateOnUpdate);
        assert!(StrategyProfile::new(base.clone()).allow_create_on_update());

        let main = StrategyProfile::<Widget>::new(Arc::new(SplitStrategy::main_resource(base.clone())));
        assert!(main.allow_create_on_update());

        let status = StrategyProfile::<Widget>::new(Arc::new(SplitStrategy::status_subresource(base)));
        assert!(!status.allow_create_on_update());
    }
}
