//! Identity and content-descriptor types shared by the model, the differ and the surface
use serde::Serialize;
use std::any::{self, Any};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable, opaque identity of a section or a cell.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    /// Mints a fresh id backed by a v4 UUID.
    pub fn random() -> Self {
        ItemId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId(id)
    }
}

impl From<Uuid> for ItemId {
    fn from(id: Uuid) -> Self {
        ItemId(id.to_string())
    }
}

/// Type tag identifying a renderable kind of content.
///
/// Surfaces key their recyclable views on this tag, see [`crate::registry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContentKind(Cow<'static, str>);

impl ContentKind {
    /// The kind derived from a component's Rust type name.
    pub fn of<C: ?Sized + 'static>() -> Self {
        ContentKind(Cow::Borrowed(any::type_name::<C>()))
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        ContentKind(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a cell: section index, then item index within that section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub const fn new(section: usize, item: usize) -> Self {
        IndexPath { section, item }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

/// A renderable piece of content.
///
/// Two components are content-equal when they share a [`ContentKind`] and their
/// view models compare equal.
pub trait Component: Send + Sync + 'static {
    type ViewModel: PartialEq + fmt::Debug + Send + Sync + 'static;

    fn view_model(&self) -> &Self::ViewModel;

    fn kind(&self) -> ContentKind {
        ContentKind::of::<Self>()
    }

    /// Textual rendering of the content, used by surfaces that draw text.
    fn render(&self) -> String {
        format!("{:?}", self.view_model())
    }
}

trait ErasedComponent: Send + Sync {
    fn kind(&self) -> ContentKind;
    fn view_model_eq(&self, other: &dyn Any) -> bool;
    fn view_model_any(&self) -> &dyn Any;
    fn view_model_debug(&self) -> &dyn fmt::Debug;
    fn render(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

impl<C: Component> ErasedComponent for C {
    fn kind(&self) -> ContentKind {
        Component::kind(self)
    }

    fn view_model_eq(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<C::ViewModel>()
            .is_some_and(|other| other == self.view_model())
    }

    fn view_model_any(&self) -> &dyn Any {
        self.view_model()
    }

    fn view_model_debug(&self) -> &dyn fmt::Debug {
        self.view_model()
    }

    fn render(&self) -> String {
        Component::render(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased, cheaply clonable content descriptor.
///
/// Equality is content equality: same kind and equal view models.
#[derive(Clone)]
pub struct AnyComponent {
    inner: Arc<dyn ErasedComponent>,
}

impl AnyComponent {
    pub fn new<C: Component>(component: C) -> Self {
        AnyComponent {
            inner: Arc::new(component),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.inner.kind()
    }

    pub fn is_content_equal(&self, other: &AnyComponent) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.kind() == other.kind()
                && self.inner.view_model_eq(other.inner.view_model_any()))
    }

    pub fn render(&self) -> String {
        self.inner.render()
    }

    /// Recovers the concrete component, if it is a `C`.
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.inner.as_any().downcast_ref::<C>()
    }
}

impl PartialEq for AnyComponent {
    fn eq(&self, other: &Self) -> bool {
        self.is_content_equal(other)
    }
}

impl fmt::Debug for AnyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyComponent")
            .field("kind", &self.kind().as_str())
            .field("view_model", self.inner.view_model_debug())
            .finish()
    }
}

impl<C: Component> From<C> for AnyComponent {
    fn from(component: C) -> Self {
        AnyComponent::new(component)
    }
}
