//! Field kind inference and value generators
//!
//! A header such as `联系电话` or `Email Address` is mapped to a semantic
//! kind by keyword; each kind has a generator producing plausible values.

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

const SURNAMES: &[&str] = &[
    "赵", "钱", "孙", "李", "周", "吴", "郑", "王", "冯", "陈", "褚", "卫", "蒋", "沈", "韩",
    "杨", "朱", "秦", "尤", "许", "何", "吕", "施", "张", "孔", "曹", "严", "华", "金", "魏",
];

const GIVEN_NAMES: &[&str] = &[
    "明", "国", "华", "文", "平", "志", "伟", "芳", "军", "敏", "静", "强", "磊", "洋", "勇",
    "艳", "杰", "娟", "涛", "超", "波", "秀", "刚", "辉", "鹏", "飞", "鑫",
];

/// Departments used for generated rows and batch submitters
pub const DEPARTMENTS: &[&str] = &[
    "技术部", "人事部", "财务部", "市场部", "销售部", "运营部", "产品部", "客服部", "行政部",
    "法务部",
];

const CITIES: &[&str] = &[
    "北京市朝阳区",
    "上海市浦东新区",
    "广州市天河区",
    "深圳市南山区",
    "杭州市西湖区",
    "成都市武侯区",
    "武汉市江汉区",
    "南京市鼓楼区",
];

const MOBILE_PREFIXES: &[&str] = &[
    "130", "131", "132", "133", "134", "135", "136", "137", "138", "139", "150", "151", "152",
    "153", "155", "156", "157", "158", "159", "180", "181", "182", "183", "184", "185", "186",
    "187", "188", "189",
];

const MAIL_DOMAINS: &[&str] = &["qq.com", "163.com", "gmail.com", "outlook.com", "hotmail.com"];

const PHRASES: &[&str] = &[
    "测试数据",
    "自动生成",
    "功能验证",
    "接口联调",
    "样例内容",
    "批量提交",
    "填写说明",
    "备注信息",
];

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Semantic kind of a field, inferred from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Name,
    Age,
    Phone,
    Email,
    IdCard,
    Date,
    Boolean,
    Department,
    Address,
    Text,
}

/// Keyword table; the first kind with a matching keyword wins
const RULES: &[(FieldKind, &[&str])] = &[
    (FieldKind::Name, &["姓名", "人名", "用户", "name"]),
    (FieldKind::Age, &["年龄", "岁数", "age"]),
    (FieldKind::Phone, &["电话", "手机", "联系方式", "phone", "tel"]),
    (FieldKind::Email, &["邮箱", "email", "mail"]),
    (FieldKind::IdCard, &["身份证", "证件号", "id"]),
    (FieldKind::Date, &["日期", "时间", "生日", "date", "time"]),
    (FieldKind::Boolean, &["是否", "是", "否", "启用", "禁用", "active"]),
    (FieldKind::Department, &["部门", "单位", "department"]),
    (FieldKind::Address, &["地址", "住址", "address"]),
];

impl FieldKind {
    /// Infer the kind from a header or column name, ignoring ASCII case
    pub fn infer(field_name: &str) -> Self {
        let lowered = field_name.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(kind, _)| *kind)
            .unwrap_or(FieldKind::Text)
    }

    /// Short label used in reports
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Name => "name",
            FieldKind::Age => "age",
            FieldKind::Phone => "phone",
            FieldKind::Email => "email",
            FieldKind::IdCard => "id_card",
            FieldKind::Date => "date",
            FieldKind::Boolean => "boolean",
            FieldKind::Department => "department",
            FieldKind::Address => "address",
            FieldKind::Text => "text",
        }
    }

    /// Generate a value of this kind
    ///
    /// Ages are numbers, everything else is a string.
    pub fn generate<R: Rng + ?Sized>(self, rng: &mut R) -> Value {
        match self {
            FieldKind::Name => Value::from(person_name(rng)),
            FieldKind::Age => Value::from(rng.gen_range(18..=65)),
            FieldKind::Phone => Value::from(mobile_number(rng)),
            FieldKind::Email => Value::from(email(rng)),
            FieldKind::IdCard => Value::from(id_card(rng)),
            FieldKind::Date => Value::from(recent_date(rng, 365)),
            FieldKind::Boolean => Value::from(pick(rng, &["是", "否"])),
            FieldKind::Department => Value::from(pick(rng, DEPARTMENTS)),
            FieldKind::Address => Value::from(address(rng)),
            FieldKind::Text => Value::from(alphanumeric(rng, 10)),
        }
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&str]) -> String {
    items.choose(rng).copied().unwrap_or_default().to_string()
}

/// Surname plus one or two given-name characters
pub fn person_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut name = pick(rng, SURNAMES);
    name.push_str(&pick(rng, GIVEN_NAMES));
    if rng.gen_bool(0.5) {
        name.push_str(&pick(rng, GIVEN_NAMES));
    }
    name
}

/// Eleven-digit mobile number with a carrier prefix
pub fn mobile_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut number = pick(rng, MOBILE_PREFIXES);
    number.push_str(&digits(rng, 8));
    number
}

pub fn email<R: Rng + ?Sized>(rng: &mut R) -> String {
    let user: String = (0..8).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
    format!("{}@{}", user, pick(rng, MAIL_DOMAINS))
}

/// Eighteen-character identity number; the check character is random
pub fn id_card<R: Rng + ?Sized>(rng: &mut R) -> String {
    let area = rng.gen_range(110_000..=659_999);
    let birth = NaiveDate::from_ymd_opt(
        rng.gen_range(1970..=2005),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    )
    .unwrap_or_default();
    let check = *b"0123456789X".choose(rng).unwrap_or(&b'0') as char;
    format!("{}{}{}{}", area, birth.format("%Y%m%d"), digits(rng, 3), check)
}

/// A `YYYY-MM-DD` date between `days` ago and today
pub fn recent_date<R: Rng + ?Sized>(rng: &mut R, days: i64) -> String {
    let offset = rng.gen_range(0..=days);
    (Local::now().date_naive() - ChronoDuration::days(offset))
        .format("%Y-%m-%d")
        .to_string()
}

pub fn address<R: Rng + ?Sized>(rng: &mut R) -> String {
    let building = pick(rng, &["A", "B", "C", "D"]);
    format!(
        "{}{}号{}栋{}室",
        pick(rng, CITIES),
        rng.gen_range(1..=999),
        building,
        rng.gen_range(1..=999)
    )
}

/// A short phrase-based sentence
pub fn sentence<R: Rng + ?Sized>(rng: &mut R) -> String {
    let words = rng.gen_range(2..=4);
    let mut text: Vec<String> = (0..words).map(|_| pick(rng, PHRASES)).collect();
    text.dedup();
    format!("{}。", text.join("，"))
}

pub fn alphanumeric<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| *ALPHANUMERIC.choose(rng).unwrap_or(&b'x') as char)
        .collect()
}

pub fn digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| rng.gen_range(b'0'..=b'9') as char).collect()
}
