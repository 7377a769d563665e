use crate::model::Record;

/// 搜索词是否命中记录：任一搜索字段包含该词（不区分大小写）
///
/// 去除首尾空白后为空的搜索词匹配所有记录。
pub fn matches<R: Record>(record: &R, term: &str) -> bool {
    if term.trim().is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// 过滤结果，保持原集合顺序
pub fn filter<'a, R: Record>(items: &'a [R], term: &str) -> Vec<&'a R> {
    items.iter().filter(|r| matches(*r, term)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;
    use chrono::NaiveDate;

    fn user(id: i64, first: &str, email: &str) -> User {
        User {
            id,
            first_name: first.to_string(),
            last_name: "Pérez".to_string(),
            second_last_name: "Gómez".to_string(),
            email: email.to_string(),
            status: 1,
            registered_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_case_insensitive_across_fields() {
        let users = vec![
            user(1, "María", "maria@example.com"),
            user(2, "Juan", "JUAN@corp.mx"),
            user(3, "Luis", "luis@example.com"),
        ];

        let ids: Vec<i64> = filter(&users, "CORP").iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2]);

        let ids: Vec<i64> = filter(&users, "example").iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3]);

        // 父姓命中所有人
        assert_eq!(filter(&users, "pérez").len(), 3);
    }

    #[test]
    fn test_blank_term_matches_everything() {
        let users = vec![user(1, "Ana", "ana@x.io")];
        assert_eq!(filter(&users, "").len(), 1);
        assert_eq!(filter(&users, "   ").len(), 1);
        assert!(filter(&users, "zzz").is_empty());
    }
}
