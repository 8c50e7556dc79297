//! Best-effort Telegram notifications for run statuses.
//!
//! Missing `TG_TOKEN`/`TG_CHAT_ID` silently disables the channel; a failed
//! send is logged and never fails the pipeline.

use serde::Serialize;

const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub async fn send_tg_message(text: &str) {
    let (token, chat_id) = match (crate::env_var("TG_TOKEN"), crate::env_var("TG_CHAT_ID")) {
        (Ok(token), Ok(chat_id)) => (token, chat_id),
        _ => return,
    };

    let text: String = text.chars().take(MAX_MESSAGE_LEN).collect();
    let url = format!("https://api.telegram.org/bot{token}/sendMessage");
    let client = reqwest::Client::new();
    let res = client
        .post(url)
        .form(&SendMessage {
            chat_id: &chat_id,
            text: &text,
        })
        .send()
        .await;
    match res {
        Ok(resp) if !resp.status().is_success() => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            log::error!(
                "Не удалось отправить сообщение в Telegram: {status} {}",
                crate::truncate_body(&body)
            );
        }
        Ok(_) => {}
        Err(err) => log::error!("Не удалось отправить сообщение в Telegram: {err}"),
    }
}

/// `🏁 Скрипт запущен 'wb_stocks': …` marker at the top of every run.
pub async fn notify_started(script: &str) {
    let now = time::OffsetDateTime::now_utc();
    send_tg_message(&format!(
        "🏁 Скрипт запущен '{script}': {} {:02}:{:02}",
        crate::format_date(now.date()),
        now.hour(),
        now.minute()
    ))
    .await;
}

pub async fn notify_finished(script: &str, elapsed: &std::time::Duration) {
    send_tg_message(&format!(
        "😎 '{script}' завершён за {}",
        crate::format_duration(elapsed)
    ))
    .await;
}
