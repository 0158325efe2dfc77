//! 注册条件
//!
//! 条件决定 bean 定义在冻结阶段是否保留。多个条件用 `and`/`or` 串联，
//! 从左到右依次求值，不区分优先级：`a or b and c` 等价于 `(a or b) and c`。

use crate::definition::BeanInfo;
use crate::selector::BeanSelector;
use config_abstractions::PropertySource;
use infrastructure_common::{expression, DependencyError, DependencyResult};
use std::fmt;
use tracing::debug;

/// 条件求值上下文
pub trait ConditionContext {
    /// 属性视图
    fn properties(&self) -> &dyn PropertySource;

    /// 查找满足选择器的 bean，被查到的 bean 会先完成自身的条件求值
    fn find_bean(&mut self, selector: &BeanSelector) -> DependencyResult<Vec<BeanInfo>>;

    /// 当前激活的 profile，多个 profile 用逗号分隔
    fn profile(&self) -> Option<&str>;
}

/// 条件 trait
pub trait Condition: fmt::Debug {
    /// 是否满足条件
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool>;
}

/// 属性存在
#[derive(Debug, Clone)]
pub struct PropertyCondition {
    name: String,
}

impl PropertyCondition {
    /// 创建条件
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Condition for PropertyCondition {
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        Ok(ctx.properties().has(&self.name))
    }
}

/// 属性不存在
#[derive(Debug, Clone)]
pub struct MissingPropertyCondition {
    name: String,
}

impl MissingPropertyCondition {
    /// 创建条件
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Condition for MissingPropertyCondition {
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        Ok(!ctx.properties().has(&self.name))
    }
}

/// 属性值匹配
///
/// 期望值中含有 `$` 时作为表达式求值（`$` 代表属性值），否则按字符串相等比较
#[derive(Debug, Clone)]
pub struct PropertyValueCondition {
    name: String,
    having_value: String,
    match_if_missing: bool,
}

impl PropertyValueCondition {
    /// 创建条件
    pub fn new(name: impl Into<String>, having_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            having_value: having_value.into(),
            match_if_missing: false,
        }
    }

    /// 属性不存在时视为满足
    pub fn match_if_missing(mut self) -> Self {
        self.match_if_missing = true;
        self
    }
}

impl Condition for PropertyValueCondition {
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        let props = ctx.properties();
        let Some(value) = props.get(&self.name) else {
            return Ok(self.match_if_missing && !props.has(&self.name));
        };
        if self.having_value.contains('$') {
            return Ok(expression::evaluate(&self.having_value, value)?);
        }
        Ok(value == self.having_value)
    }
}

/// 存在满足选择器的 bean
#[derive(Debug, Clone)]
pub struct BeanCondition {
    selector: BeanSelector,
}

impl BeanCondition {
    /// 创建条件
    pub fn new(selector: BeanSelector) -> Self {
        Self { selector }
    }
}

impl Condition for BeanCondition {
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        Ok(!ctx.find_bean(&self.selector)?.is_empty())
    }
}

/// 不存在满足选择器的 bean
#[derive(Debug, Clone)]
pub struct MissingBeanCondition {
    selector: BeanSelector,
}

impl MissingBeanCondition {
    /// 创建条件
    pub fn new(selector: BeanSelector) -> Self {
        Self { selector }
    }
}

impl Condition for MissingBeanCondition {
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        Ok(ctx.find_bean(&self.selector)?.is_empty())
    }
}

/// 通用表达式条件，目前不支持求值
#[derive(Debug, Clone)]
pub struct ExpressionCondition {
    expression: String,
}

impl ExpressionCondition {
    /// 创建条件
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

impl Condition for ExpressionCondition {
    fn matches(&self, _: &mut dyn ConditionContext) -> DependencyResult<bool> {
        Err(DependencyError::Unsupported {
            message: format!("expression condition \"{}\" is not supported", self.expression),
        })
    }
}

type MatchFn = dyn Fn(&mut dyn ConditionContext) -> DependencyResult<bool>;

/// 自定义函数条件
pub struct FunctionCondition {
    func: Box<MatchFn>,
}

impl FunctionCondition {
    /// 创建条件
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut dyn ConditionContext) -> DependencyResult<bool> + 'static,
    {
        Self { func: Box::new(func) }
    }
}

impl fmt::Debug for FunctionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FunctionCondition")
    }
}

impl Condition for FunctionCondition {
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        (self.func)(ctx)
    }
}

/// profile 条件，激活的 profile 中任一项与之相同（忽略大小写）即满足
#[derive(Debug, Clone)]
pub struct ProfileCondition {
    profile: String,
}

impl ProfileCondition {
    /// 创建条件
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }
}

impl Condition for ProfileCondition {
    fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        Ok(ctx.profile().map_or(false, |active| {
            active
                .split(',')
                .any(|p| p.trim().eq_ignore_ascii_case(self.profile.trim()))
        }))
    }
}

/// 条件之间的连接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// 与
    And,
    /// 或
    Or,
}

#[derive(Debug)]
struct Node {
    cond: Box<dyn Condition>,
    next: Option<Link>,
}

/// 条件链
#[derive(Debug, Default)]
pub struct Conditional {
    nodes: Vec<Node>,
    pending: Option<Link>,
}

impl Conditional {
    /// 创建空条件链，空条件链总是满足
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否没有任何条件
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 条件数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 在当前节点上设置条件
    ///
    /// 当前节点已有条件且没有调用 [`Self::and`] 或 [`Self::or`] 时返回错误
    pub fn on(&mut self, cond: impl Condition + 'static) -> DependencyResult<&mut Self> {
        match (self.nodes.last_mut(), self.pending.take()) {
            (None, _) => {}
            (Some(last), Some(link)) => last.next = Some(link),
            (Some(_), None) => return Err(DependencyError::ConditionAlreadySet),
        }
        self.nodes.push(Node {
            cond: Box::new(cond),
            next: None,
        });
        Ok(self)
    }

    /// 以“与”连接下一个条件
    pub fn and(&mut self) -> &mut Self {
        if !self.nodes.is_empty() {
            self.pending = Some(Link::And);
        }
        self
    }

    /// 以“或”连接下一个条件
    pub fn or(&mut self) -> &mut Self {
        if !self.nodes.is_empty() {
            self.pending = Some(Link::Or);
        }
        self
    }

    /// 属性存在
    pub fn on_property(&mut self, name: &str) -> DependencyResult<&mut Self> {
        self.on(PropertyCondition::new(name))
    }

    /// 属性不存在
    pub fn on_missing_property(&mut self, name: &str) -> DependencyResult<&mut Self> {
        self.on(MissingPropertyCondition::new(name))
    }

    /// 属性值匹配
    pub fn on_property_value(&mut self, name: &str, having_value: &str) -> DependencyResult<&mut Self> {
        self.on(PropertyValueCondition::new(name, having_value))
    }

    /// 存在满足选择器的 bean
    pub fn on_bean(&mut self, selector: &str) -> DependencyResult<&mut Self> {
        let selector = BeanSelector::parse(selector)?;
        self.on(BeanCondition::new(selector))
    }

    /// 不存在满足选择器的 bean
    pub fn on_missing_bean(&mut self, selector: &str) -> DependencyResult<&mut Self> {
        let selector = BeanSelector::parse(selector)?;
        self.on(MissingBeanCondition::new(selector))
    }

    /// 表达式条件
    pub fn on_expression(&mut self, expression: &str) -> DependencyResult<&mut Self> {
        self.on(ExpressionCondition::new(expression))
    }

    /// 自定义函数条件
    pub fn on_match<F>(&mut self, func: F) -> DependencyResult<&mut Self>
    where
        F: Fn(&mut dyn ConditionContext) -> DependencyResult<bool> + 'static,
    {
        self.on(FunctionCondition::new(func))
    }

    /// 从左到右求值，按连接方式短路
    pub fn matches(&self, ctx: &mut dyn ConditionContext) -> DependencyResult<bool> {
        let Some(first) = self.nodes.first() else {
            return Ok(true);
        };

        let mut result = first.cond.matches(ctx)?;
        for pair in self.nodes.windows(2) {
            let (prev, node) = (&pair[0], &pair[1]);
            result = match prev.next.unwrap_or(Link::And) {
                Link::And if !result => false,
                Link::Or if result => true,
                _ => node.cond.matches(ctx)?,
            };
        }

        debug!("条件求值结果: {} ({} 个条件)", result, self.nodes.len());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure_common::{ConfigResult, TypeInfo};
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    #[derive(Default)]
    struct MapSource(BTreeMap<String, String>);

    impl PropertySource for MapSource {
        fn get(&self, key: &str) -> Option<&str> {
            self.0.get(key).map(String::as_str)
        }

        fn has(&self, key: &str) -> bool {
            self.0.keys().any(|k| k == key || k.starts_with(&format!("{key}.")))
        }

        fn sub_keys(&self, _: &str) -> Vec<String> {
            Vec::new()
        }

        fn resolve(&self, template: &str) -> ConfigResult<String> {
            Ok(template.to_string())
        }
    }

    #[derive(Default)]
    struct TestContext {
        props: MapSource,
        beans: Vec<BeanInfo>,
        profile: Option<String>,
    }

    impl ConditionContext for TestContext {
        fn properties(&self) -> &dyn PropertySource {
            &self.props
        }

        fn find_bean(&mut self, selector: &BeanSelector) -> DependencyResult<Vec<BeanInfo>> {
            Ok(self
                .beans
                .iter()
                .filter(|b| selector.matches_name(&b.name) && b.any_type(|t| selector.matches_type(t)))
                .cloned()
                .collect())
        }

        fn profile(&self) -> Option<&str> {
            self.profile.as_deref()
        }
    }

    struct Db;

    fn context() -> TestContext {
        let mut props = MapSource::default();
        props.0.insert("server.port".into(), "8080".into());
        props.0.insert("mode".into(), "fast".into());
        TestContext {
            props,
            beans: vec![BeanInfo {
                name: "db".into(),
                type_info: TypeInfo::of::<Db>(),
                exports: Vec::new(),
                description: "db@lib.rs:1".into(),
                kind: crate::BeanKind::Object,
                primary: false,
                status: crate::BeanStatus::Resolved,
            }],
            profile: Some("dev, test".into()),
        }
    }

    #[derive(Debug)]
    struct Fixed(bool, Rc<Cell<usize>>);

    impl Condition for Fixed {
        fn matches(&self, _: &mut dyn ConditionContext) -> DependencyResult<bool> {
            self.1.set(self.1.get() + 1);
            Ok(self.0)
        }
    }

    #[test]
    fn test_property_conditions() {
        let mut ctx = context();
        assert!(PropertyCondition::new("server").matches(&mut ctx).unwrap());
        assert!(!PropertyCondition::new("client").matches(&mut ctx).unwrap());
        assert!(MissingPropertyCondition::new("client").matches(&mut ctx).unwrap());
    }

    #[test]
    fn test_property_value_condition() {
        let mut ctx = context();
        assert!(PropertyValueCondition::new("mode", "fast").matches(&mut ctx).unwrap());
        assert!(!PropertyValueCondition::new("mode", "slow").matches(&mut ctx).unwrap());
        assert!(PropertyValueCondition::new("server.port", "$>8000 && $<9000")
            .matches(&mut ctx)
            .unwrap());
        assert!(!PropertyValueCondition::new("missing", "x").matches(&mut ctx).unwrap());
        assert!(PropertyValueCondition::new("missing", "x")
            .match_if_missing()
            .matches(&mut ctx)
            .unwrap());
    }

    #[test]
    fn test_bean_conditions() {
        let mut ctx = context();
        let sel = BeanSelector::parse("Db:db").unwrap();
        assert!(BeanCondition::new(sel.clone()).matches(&mut ctx).unwrap());
        assert!(!MissingBeanCondition::new(sel).matches(&mut ctx).unwrap());
        let other = BeanSelector::by_name("cache");
        assert!(MissingBeanCondition::new(other).matches(&mut ctx).unwrap());
    }

    #[test]
    fn test_profile_condition() {
        let mut ctx = context();
        assert!(ProfileCondition::new("TEST").matches(&mut ctx).unwrap());
        assert!(!ProfileCondition::new("prod").matches(&mut ctx).unwrap());
        ctx.profile = None;
        assert!(!ProfileCondition::new("dev").matches(&mut ctx).unwrap());
    }

    #[test]
    fn test_expression_condition_unsupported() {
        let mut ctx = context();
        let err = ExpressionCondition::new("a > b").matches(&mut ctx).unwrap_err();
        assert!(matches!(err, DependencyError::Unsupported { .. }));
    }

    #[test]
    fn test_empty_conditional() {
        let mut ctx = context();
        assert!(Conditional::new().matches(&mut ctx).unwrap());
    }

    #[test]
    fn test_condition_already_set() {
        let mut cond = Conditional::new();
        cond.on_property("a").unwrap();
        let err = cond.on_property("b").unwrap_err();
        assert!(matches!(err, DependencyError::ConditionAlreadySet));
        cond.and().on_property("b").unwrap();
        assert_eq!(cond.len(), 2);
    }

    #[test]
    fn test_left_to_right_evaluation() {
        let mut ctx = context();
        let calls = Rc::new(Cell::new(0));

        // (true or false) and false == false，而按优先级计算会得到 true
        let mut cond = Conditional::new();
        cond.on(Fixed(true, calls.clone())).unwrap();
        cond.or().on(Fixed(false, calls.clone())).unwrap();
        cond.and().on(Fixed(false, calls.clone())).unwrap();
        assert!(!cond.matches(&mut ctx).unwrap());
        // 第二个条件被短路
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_function_condition() {
        let mut ctx = context();
        let mut cond = Conditional::new();
        cond.on_match(|ctx| Ok(ctx.properties().get("mode") == Some("fast")))
            .unwrap();
        assert!(cond.matches(&mut ctx).unwrap());
    }
}
