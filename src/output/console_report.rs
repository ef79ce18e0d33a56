// 该文件是 Malaeng （แมลง） 项目的一部分。
// src/output/console_report.rs - 控制台文字报告
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  fmt::Display,
  io::{Stdout, Write},
  sync::Mutex,
};

use crate::{
  advisory::{Advice, Tone, Verdict},
  frame::RgbNhwcFrame,
  output::Render,
};

// 面向用户的文字与建议表保持同一语言
const DETECTED_HEADER: &str = "แมลงที่ตรวจพบ:";
const NOTHING_DETECTED: &str = "ไม่พบแมลงในภาพ";
const SUMMARY_HEADER: &str = "📊 สรุปผลรวม";
const GOOD_LINE: &str = "✅ แมลงดี:";
const BAD_LINE: &str = "⚠️ ศัตรูพืช:";
const UNKNOWN_LINE: &str = "❓ ไม่ทราบชนิด:";
const NONE_FOUND: &str = "ไม่มี";
const SEPARATOR: &str = "---";

fn verdict_text(verdict: Verdict) -> &'static str {
  match verdict {
    Verdict::HarmfulDominant => {
      "💡 พบศัตรูพืชมากกว่าแมลงดี — แนะนำใช้วิธีควบคุมแบบชีวภาพหรือติดตั้งกับดักฟีโรโมน"
    }
    Verdict::BeneficialDominant => "🌿 ระบบนิเวศดี มีแมลงดีมากกว่า ควรรักษาสมดุลไว้",
    Verdict::Balanced => "⚖️ สมดุลแมลงดีและศัตรูพืชค่อนข้างเท่ากัน",
  }
}

fn tone_marker(tone: Tone) -> &'static str {
  match tone {
    Tone::Positive => "[+]",
    Tone::Negative => "[-]",
    Tone::Neutral => "[?]",
  }
}

fn join_or_none(labels: &[String]) -> String {
  if labels.is_empty() {
    NONE_FOUND.to_string()
  } else {
    labels.join(", ")
  }
}

/// 将检测与建议写为文字报告
pub struct ConsoleReport<W> {
  writer: Mutex<W>,
}

impl ConsoleReport<Stdout> {
  pub fn stdout() -> Self {
    Self::new(std::io::stdout())
  }
}

impl<W: Write> ConsoleReport<W> {
  pub fn new(writer: W) -> Self {
    Self {
      writer: Mutex::new(writer),
    }
  }

  pub fn into_inner(self) -> W {
    self
      .writer
      .into_inner()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn with_writer<F>(&self, f: F) -> std::io::Result<()>
  where
    F: FnOnce(&mut W) -> std::io::Result<()>,
  {
    let mut writer = self
      .writer
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut writer)?;
    writer.flush()
  }

  /// 向用户显示错误信息
  pub fn report_error(&self, message: &dyn Display) -> std::io::Result<()> {
    self.with_writer(|w| writeln!(w, "❌ {}", message))
  }

  /// 交互提示
  pub fn prompt(&self, message: &str) -> std::io::Result<()> {
    self.with_writer(|w| write!(w, "{}", message))
  }
}

impl<W: Write> Render<RgbNhwcFrame, Advice> for ConsoleReport<W> {
  type Error = std::io::Error;

  fn render_result(&self, _frame: &RgbNhwcFrame, result: &Advice) -> Result<(), Self::Error> {
    self.with_writer(|w| {
      let detections = &result.detections;
      let summary = &result.summary;

      if detections.is_empty() {
        writeln!(w, "{}", NOTHING_DETECTED)?;
      } else {
        let labels: Vec<&str> = detections.labels().collect();
        writeln!(w, "{} {}", DETECTED_HEADER, labels.join(", "))?;
        for item in detections.items.iter() {
          writeln!(
            w,
            "  - {}: {:.2}% at ({:.3}, {:.3}, {:.3}, {:.3})",
            item.label,
            item.score * 100.0,
            item.bbox[0],
            item.bbox[1],
            item.bbox[2],
            item.bbox[3]
          )?;
        }
      }

      for message in &summary.messages {
        writeln!(w, "{} {}", tone_marker(message.tone), message.text)?;
      }

      writeln!(w, "{}", SEPARATOR)?;
      writeln!(w, "{}", SUMMARY_HEADER)?;
      writeln!(w, "{} {}", GOOD_LINE, join_or_none(&summary.found_good))?;
      writeln!(w, "{} {}", BAD_LINE, join_or_none(&summary.found_bad))?;
      writeln!(w, "{} {}", UNKNOWN_LINE, join_or_none(&summary.found_unknown))?;
      writeln!(w, "{}", verdict_text(summary.verdict))
    })
  }
}
