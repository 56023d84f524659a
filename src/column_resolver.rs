//! 按关键词优先级定位表头。
//!
//! 导出格式的表头有中英文等多种写法（例如 "商品条码" 与 "JD SKU"），
//! 这里用子串匹配加优先级顺序来确定列，不依赖固定的表结构。

use tracing::debug;

/// 有序的候选关键词，排在前面的优先
#[derive(Debug, Clone)]
pub struct ColumnResolver<'k> {
    label: &'k str,
    keywords: &'k [String],
}

impl<'k> ColumnResolver<'k> {
    pub fn new(label: &'k str, keywords: &'k [String]) -> Self {
        Self { label, keywords }
    }

    /// 返回匹配列的下标
    ///
    /// 依次尝试每个关键词：只要某个关键词匹配到任何表头，就取表头顺序中的第一个，
    /// 不再看后面的关键词。区分大小写。
    pub fn resolve_index<S: AsRef<str>>(&self, headers: &[S]) -> Option<usize> {
        // 空关键词会匹配所有表头
        for keyword in self.keywords.iter().filter(|k| !k.is_empty()) {
            let matches: Vec<usize> = headers
                .iter()
                .enumerate()
                .filter(|(_, h)| h.as_ref().contains(keyword.as_str()))
                .map(|(i, _)| i)
                .collect();
            debug!(
                "[{}] 关键词 keyword '{}' 匹配到 matched: {:?}",
                self.label,
                keyword,
                matches.iter().map(|&i| headers[i].as_ref()).collect::<Vec<_>>()
            );
            if let Some(&first) = matches.first() {
                return Some(first);
            }
        }
        debug!("[{}] 未找到列 column not found", self.label);
        None
    }

    /// 返回匹配的表头文本
    pub fn resolve<'h, S: AsRef<str>>(&self, headers: &'h [S]) -> Option<&'h str> {
        self.resolve_index(headers).map(|i| headers[i].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn higher_priority_keyword_wins_over_column_order() {
        let headers = ["商品条码", "名称", "JD SKU"];
        let keywords = kw(&["JD SKU", "商品条码"]);
        let resolver = ColumnResolver::new("sku", &keywords);
        assert_eq!(resolver.resolve(&headers), Some("JD SKU"));
        assert_eq!(resolver.resolve_index(&headers), Some(2));
    }

    #[test]
    fn first_header_in_column_order_for_same_keyword() {
        let headers = ["备注", "出库单号", "订单号"];
        let keywords = kw(&["单号"]);
        assert_eq!(ColumnResolver::new("order", &keywords).resolve(&headers), Some("出库单号"));
    }

    #[test]
    fn falls_back_to_lower_priority_keyword() {
        let headers = ["Goods NO.", "Receiving QTY."];
        let keywords = kw(&["验收量", "Receiving QTY."]);
        assert_eq!(
            ColumnResolver::new("qty", &keywords).resolve(&headers),
            Some("Receiving QTY.")
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        let headers = ["qty"];
        let keywords = kw(&["QTY"]);
        assert_eq!(ColumnResolver::new("qty", &keywords).resolve(&headers), None);
    }

    #[test]
    fn no_match_and_empty_inputs_are_not_found() {
        let keywords = kw(&["Length"]);
        let resolver = ColumnResolver::new("len", &keywords);
        assert_eq!(resolver.resolve(&["Width", "Height"]), None);
        assert_eq!(resolver.resolve::<&str>(&[]), None);
        assert_eq!(ColumnResolver::new("none", &[]).resolve(&["Length"]), None);
    }

    #[test]
    fn empty_keyword_is_ignored() {
        let headers = ["备注", "Length"];
        let keywords = kw(&["", "Length"]);
        assert_eq!(ColumnResolver::new("len", &keywords).resolve(&headers), Some("Length"));

        let only_empty = kw(&[""]);
        assert_eq!(ColumnResolver::new("len", &only_empty).resolve(&headers), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        let headers = vec!["复核数量".to_string(), "QTY".to_string(), "Rechecked QTY".to_string()];
        let keywords = kw(&["Rechecked QTY", "QTY"]);
        let resolver = ColumnResolver::new("qty", &keywords);
        let first = resolver.resolve_index(&headers);
        for _ in 0..5 {
            assert_eq!(resolver.resolve_index(&headers), first);
        }
        assert_eq!(first, Some(2));
    }
}
