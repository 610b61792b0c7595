//! 查询过滤
//!
//! 存储查询接收类型过滤（作用于类型标签）和实体过滤（作用于 `dyn StoredEntity`）。
//! 两者都是规格：普通闭包即可使用，并可通过 `and` / `or` / `not` 组合。
//!
use crate::entity::{Entity, StoredEntity};

/// 可复用、可组合的谓词。
pub trait Specification<T: ?Sized> {
    /// 候选对象是否满足该规格。
    fn is_satisfied_by(&self, candidate: &T) -> bool;

    /// 两者都须满足。
    fn and<S>(self, other: S) -> AndSpecification<T>
    where
        Self: Sized + 'static,
        S: Specification<T> + 'static,
    {
        AndSpecification::new(Box::new(self), Box::new(other))
    }

    /// 任一满足即可。
    fn or<S>(self, other: S) -> OrSpecification<T>
    where
        Self: Sized + 'static,
        S: Specification<T> + 'static,
    {
        OrSpecification::new(Box::new(self), Box::new(other))
    }

    fn not(self) -> NotSpecification<T>
    where
        Self: Sized + 'static,
    {
        NotSpecification::new(Box::new(self))
    }
}

impl<T: ?Sized, F> Specification<T> for F
where
    F: Fn(&T) -> bool,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self(candidate)
    }
}

pub struct AndSpecification<T: ?Sized> {
    left: Box<dyn Specification<T>>,
    right: Box<dyn Specification<T>>,
}

impl<T: ?Sized> AndSpecification<T> {
    pub fn new(left: Box<dyn Specification<T>>, right: Box<dyn Specification<T>>) -> Self {
        Self { left, right }
    }
}

impl<T: ?Sized> Specification<T> for AndSpecification<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) && self.right.is_satisfied_by(candidate)
    }
}

pub struct OrSpecification<T: ?Sized> {
    left: Box<dyn Specification<T>>,
    right: Box<dyn Specification<T>>,
}

impl<T: ?Sized> OrSpecification<T> {
    pub fn new(left: Box<dyn Specification<T>>, right: Box<dyn Specification<T>>) -> Self {
        Self { left, right }
    }
}

impl<T: ?Sized> Specification<T> for OrSpecification<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) || self.right.is_satisfied_by(candidate)
    }
}

pub struct NotSpecification<T: ?Sized> {
    inner: Box<dyn Specification<T>>,
}

impl<T: ?Sized> NotSpecification<T> {
    pub fn new(inner: Box<dyn Specification<T>>) -> Self {
        Self { inner }
    }
}

impl<T: ?Sized> Specification<T> for NotSpecification<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        !self.inner.is_satisfied_by(candidate)
    }
}

/// 实体类型标签过滤。
pub type TypeFilter<'a> = &'a dyn Specification<str>;

/// 已存储实体过滤。
pub type EntityFilter<'a> = &'a dyn Specification<dyn StoredEntity>;

/// 接受所有实体。
pub struct AnyEntity;

impl Specification<dyn StoredEntity> for AnyEntity {
    fn is_satisfied_by(&self, _candidate: &dyn StoredEntity) -> bool {
        true
    }
}

/// 只接受 `T` 的类型标签。
pub struct OfType<T>(std::marker::PhantomData<T>);

impl<T: Entity> OfType<T> {
    pub fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T: Entity> Default for OfType<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Specification<str> for OfType<T> {
    fn is_satisfied_by(&self, candidate: &str) -> bool {
        candidate == T::TYPE
    }
}
