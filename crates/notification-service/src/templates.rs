use crate::{Notification, NotificationKind};

pub struct EmailTemplate;

impl EmailTemplate {
    pub fn render(notification: &Notification) -> String {
        let body_content = match &notification.kind {
            NotificationKind::ThresholdCrossed {
                ticker,
                score,
                threshold,
                direction,
            } => {
                let color = if direction == "below" {
                    "#ef4444"
                } else {
                    "#22c55e"
                };
                format!(
                    r#"<div style="background:{color};color:#fff;padding:12px 20px;border-radius:8px 8px 0 0;font-size:18px;font-weight:700;">Survival Score Alert &mdash; {ticker}</div>
<table style="width:100%;border-collapse:collapse;">
  <tr><td style="padding:8px 12px;color:#94a3b8;">Ticker</td><td style="padding:8px 12px;font-weight:600;">{ticker}</td></tr>
  <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Current Score</td><td style="padding:8px 12px;font-weight:600;">{score:.2}</td></tr>
  <tr><td style="padding:8px 12px;color:#94a3b8;">Threshold</td><td style="padding:8px 12px;font-weight:600;">{direction} {threshold:.2}</td></tr>
</table>"#
                )
            }
            NotificationKind::ScoreDropped {
                ticker,
                previous,
                current,
                change_pct,
            } => {
                format!(
                    r#"<div style="background:#ef4444;color:#fff;padding:12px 20px;border-radius:8px 8px 0 0;font-size:18px;font-weight:700;">Score Drop &mdash; {ticker}</div>
<table style="width:100%;border-collapse:collapse;">
  <tr><td style="padding:8px 12px;color:#94a3b8;">Ticker</td><td style="padding:8px 12px;font-weight:600;">{ticker}</td></tr>
  <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Previous</td><td style="padding:8px 12px;font-weight:600;">{previous:.2}</td></tr>
  <tr><td style="padding:8px 12px;color:#94a3b8;">Current</td><td style="padding:8px 12px;font-weight:600;">{current:.2}</td></tr>
  <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Change</td><td style="padding:8px 12px;font-weight:600;color:#ef4444;">{change_pct:.2}%</td></tr>
</table>"#
                )
            }
            NotificationKind::ScoreRose {
                ticker,
                previous,
                current,
                change_pct,
            } => {
                format!(
                    r#"<div style="background:#22c55e;color:#fff;padding:12px 20px;border-radius:8px 8px 0 0;font-size:18px;font-weight:700;">Score Rise &mdash; {ticker}</div>
<table style="width:100%;border-collapse:collapse;">
  <tr><td style="padding:8px 12px;color:#94a3b8;">Ticker</td><td style="padding:8px 12px;font-weight:600;">{ticker}</td></tr>
  <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Previous</td><td style="padding:8px 12px;font-weight:600;">{previous:.2}</td></tr>
  <tr><td style="padding:8px 12px;color:#94a3b8;">Current</td><td style="padding:8px 12px;font-weight:600;">{current:.2}</td></tr>
  <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Change</td><td style="padding:8px 12px;font-weight:600;color:#22c55e;">+{change_pct:.2}%</td></tr>
</table>"#
                )
            }
        };

        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"></head>
<body style="margin:0;padding:0;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" style="background:#f1f5f9;padding:32px 0;">
  <tr><td align="center">
    <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:8px;overflow:hidden;box-shadow:0 1px 3px rgba(0,0,0,0.1);">
      <tr><td>
        {body_content}
      </td></tr>
      <tr><td style="padding:16px 20px;border-top:1px solid #e2e8f0;">
        <p style="margin:0;color:#94a3b8;font-size:12px;">
          {msg}
          <br>Sent at {ts} UTC
        </p>
      </td></tr>
    </table>
    <p style="color:#94a3b8;font-size:11px;margin-top:16px;">HEDGE Notification Service</p>
  </td></tr>
</table>
</body>
</html>"#,
            msg = notification.message.replace('<', "&lt;").replace('>', "&gt;"),
            ts = notification.timestamp.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_escapes_message_html() {
        let notification = Notification::new(
            NotificationKind::ThresholdCrossed {
                ticker: "NEM".to_string(),
                score: 42.0,
                threshold: 50.0,
                direction: "below".to_string(),
            },
            "Survival score alert",
            "<script>alert(1)</script>",
        );

        let html = EmailTemplate::render(&notification);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("NEM"));
    }
}
