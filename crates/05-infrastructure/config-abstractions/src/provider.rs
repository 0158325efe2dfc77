//! 属性来源抽象接口

use infrastructure_common::ConfigResult;
use serde_json::Value;

/// 配置文件读取器 trait
///
/// 把某种格式的文件内容解析为嵌套的 JSON 值，由属性存储负责展开
pub trait PropertyReader: Send + Sync {
    /// 解析文件内容
    fn read(&self, bytes: &[u8]) -> ConfigResult<Value>;

    /// 获取读取器名称
    fn name(&self) -> &str;

    /// 支持的文件扩展名（不含点号，小写）
    fn extensions(&self) -> &[&'static str];
}

/// 只读的属性视图
///
/// 绑定器和条件求值只通过这个接口访问属性，键均为大小写不敏感
pub trait PropertySource {
    /// 精确查找属性值
    fn get(&self, key: &str) -> Option<&str>;

    /// 键本身或其任一子键存在
    fn has(&self, key: &str) -> bool;

    /// 直接子键的名称，按字典序排列且去重
    ///
    /// `a.b.c` 与 `a.d[0]` 在 `a` 下的子键为 `b`、`d`
    fn sub_keys(&self, key: &str) -> Vec<String>;

    /// 解析模板中的 `${...}` 引用
    fn resolve(&self, template: &str) -> ConfigResult<String>;
}
