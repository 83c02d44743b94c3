//! The nine fixed business topics ("grid cells") and their keyword lists.

use serde::Serialize;

/// Grid cell identifier, 1 through 9.
pub type TopicId = u8;

/// Topic that receives segments nothing else claims (core objectives).
pub const DEFAULT_TOPIC_ID: TopicId = 5;

/// Static description of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopicDefinition {
    pub id: TopicId,
    pub title: &'static str,
    pub persona: &'static str,
    pub keywords: &'static [&'static str],
    /// Bullets used to fill the summary when there are not enough entries.
    pub default_summary: &'static [&'static str],
}

/// Look up a topic by id.
pub fn topic(id: TopicId) -> Option<&'static TopicDefinition> {
    TOPICS.iter().find(|t| t.id == id)
}

/// All topics, ordered by id.
pub static TOPICS: [TopicDefinition; 9] = [
    TopicDefinition {
        id: 1,
        title: "學員價值與定位",
        persona: "初/中階學員、家庭客",
        keywords: &["學員", "安全", "進步", "推薦", "猶豫", "預算"],
        default_summary: &[
            "關注學員安全與進步體驗",
            "記錄造成猶豫或預算衝擊的因素",
            "把握推薦轉換的最佳契機",
            "區分初學者、回鍋進階者與家庭客需求",
            "釐清學員願意付費的安心與進步價值",
            "追蹤學員學習目標與可見成果",
            "降低資訊分散造成的決策門檻",
            "維持「安全、好懂、有進步」的價值主張",
        ],
    },
    TopicDefinition {
        id: 2,
        title: "教練價值與合作",
        persona: "全職/兼職/核心教練",
        keywords: &["教練", "分潤", "教案", "曝光", "合作", "承諾"],
        default_summary: &[
            "掌握教練資源需求與承諾",
            "釐清分潤與教案支援",
            "保障合作可見度與成長",
            "維持穩定生源並減少教練行政負擔",
            "公開透明的抽成與結算規則",
            "提供教案、影片與回饋工具",
            "規劃新進到核心教練的成長路徑",
            "經營教練個人頁與評價曝光",
        ],
    },
    TopicDefinition {
        id: 3,
        title: "品牌定位與商業模式",
        persona: "策略 / 商務",
        keywords: &["品牌", "定位", "收入", "合約", "SOW", "商業", "差異"],
        default_summary: &[
            "定義品牌差異化與收入結構",
            "追蹤合約條款與商務風險",
            "連結市場驗證與募資進度",
            "鞏固「跟好教練安心學滑雪」定位",
            "以課程媒合抽成與平台服務費為主要收入",
            "評估裝備導購與聯名活動等延伸收入",
            "控管人力、系統、行銷與金流成本",
            "因應季節性與易被模仿的商業風險",
        ],
    },
    TopicDefinition {
        id: 4,
        title: "課程與產品設計",
        persona: "課務 / 產品",
        keywords: &["課程", "產品", "分級", "成果", "行前", "課後", "模組"],
        default_summary: &[
            "維護課程分級與成果敘事",
            "記錄行前 / 課後 Touchpoint",
            "確保特殊族群需求被照顧",
            "讓課程命名一看就知道適合的級別",
            "涵蓋團體、1 對 1 與親子等課程型態",
            "提供裝備指南與行前影片等行前模組",
            "以線上回顧與動作分析延伸課後體驗",
            "規劃體驗到年度成長的組合策略",
        ],
    },
    TopicDefinition {
        id: 5,
        title: "中心核心目標",
        persona: "策略 / KPI",
        keywords: &["目標", "北極星", "願景", "風險", "品質", "安心"],
        default_summary: &[
            "重申安心進步與合作北極星",
            "列示關鍵風險與防線",
            "同步策略節奏與回顧",
            "對齊學員價值與教練價值兩大支柱",
            "確認品牌商業與課程產品方向一致",
            "檢視平台體驗與營運交付品質",
            "串連行銷社群與數據能力",
            "定期回顧目標達成與下季重點",
        ],
    },
    TopicDefinition {
        id: 6,
        title: "平台體驗與工具",
        persona: "產品 / 工程",
        keywords: &["平台", "介面", "後台", "前台", "通知", "系統", "工具"],
        default_summary: &[
            "盤點前台 / 後台操作與異常",
            "追蹤工具與通知改善",
            "確保體驗支援營運 SOP",
            "找課、報名與付款流程一氣呵成",
            "教練後台提供課表與待確認訂單",
            "行前提醒與天候異動通知即時送達",
            "改期、取消與退款流程有引導",
            "手機優先並維持一致的視覺與文案",
        ],
    },
    TopicDefinition {
        id: 7,
        title: "行銷流量與社群",
        persona: "行銷 / 社群",
        keywords: &["行銷", "社群", "內容", "漏斗", "口碑", "品牌活動"],
        default_summary: &[
            "記錄內容節奏與漏斗指標",
            "聚焦品牌啟動與社群互動",
            "同步募資與行銷配套",
            "經營 IG、FB、YouTube 與 LINE 主戰場",
            "依雪季節奏安排暖身、招募與收季內容",
            "建立內容到 LINE 再到報名的導流機制",
            "以推薦碼與好友優惠放大口碑",
            "追蹤互動率、官網點擊與轉換比例",
        ],
    },
    TopicDefinition {
        id: 8,
        title: "營運流程與服務交付",
        persona: "營運 / 客服",
        keywords: &["營運", "流程", "SOP", "付款", "報名", "提醒", "追蹤"],
        default_summary: &[
            "維持報名 -> 課後完整 SOP",
            "揭露付款 / 附件流程狀態",
            "確保異常與教練媒合處置",
            "行前溝通裝備、集合點與安全事項",
            "當日報到有負責人與緊急聯絡方式",
            "天候、延誤與受傷等異常流程明確",
            "客服改期、退款與抱怨判準有時限",
            "每週與每季檢討常見問題",
        ],
    },
    TopicDefinition {
        id: 9,
        title: "數據系統與內部能力",
        persona: "資料 / PM",
        keywords: &["數據", "指標", "Dashboard", "損益", "知識庫", "紀錄"],
        default_summary: &[
            "逐步建立 Dashboard 與指標擁有權",
            "記錄損益與募資進度",
            "推進內部知識庫與培訓",
            "定義活躍學員數等北極星指標",
            "追蹤報名量、轉換率與回頭率",
            "蒐集課後評分與推薦意願",
            "沉澱 SOP、決策紀錄與專案回顧",
            "季末回顧並決定下季重點",
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_one_through_nine() {
        let ids: Vec<TopicId> = TOPICS.iter().map(|t| t.id).collect();
        assert_eq!(ids, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_every_topic_has_eight_distinct_defaults() {
        for t in TOPICS.iter() {
            let distinct: HashSet<&str> = t.default_summary.iter().copied().collect();
            assert_eq!(distinct.len(), 8, "topic {}", t.id);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(topic(3).map(|t| t.title), Some("品牌定位與商業模式"));
        assert!(topic(DEFAULT_TOPIC_ID).is_some());
        assert!(topic(0).is_none());
        assert!(topic(10).is_none());
    }
}
