use crate::models::{AppointmentNotice, EmailMessage};

pub fn subject(notice: &AppointmentNotice) -> String {
    format!(
        "New appointment: {} consultation ({} at {})",
        notice.pet_name, notice.date, notice.time
    )
}

/// Builds the doctor-facing e-mail. Client supplied fields are HTML escaped.
pub fn compose(notice: &AppointmentNotice, sender: &str) -> EmailMessage {
    let html = format!(
        r#"<html>
  <body>
    <h3>New Appointment Confirmed</h3>
    <p>Hello, Dr. <strong>{doctor}</strong>,</p>
    <p>A new consultation was added to your schedule:</p>
    <ul>
      <li><strong>Protocol:</strong> {protocol}</li>
      <li><strong>Specialty:</strong> {specialty}</li>
      <li><strong>Date:</strong> {date}</li>
      <li><strong>Time:</strong> {time}</li>
      <li><strong>Pet:</strong> {pet}</li>
      <li><strong>Owner:</strong> {client}</li>
      <li><strong>Owner contact:</strong> {contact}</li>
    </ul>
    <p>Thank you!</p>
  </body>
</html>
"#,
        doctor = escape_html(&notice.doctor_name),
        protocol = notice.appointment_id,
        specialty = escape_html(&notice.specialty),
        date = escape_html(&notice.date),
        time = escape_html(&notice.time),
        pet = escape_html(&notice.pet_name),
        client = escape_html(&notice.client_name),
        contact = escape_html(&notice.contact),
    );

    EmailMessage {
        from: sender.to_string(),
        to: notice.doctor_email.clone(),
        subject: subject(notice),
        html,
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
