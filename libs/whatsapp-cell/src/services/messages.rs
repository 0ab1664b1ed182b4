//! WhatsApp message bodies, in Portuguese, with WhatsApp `*bold*` markup.

use chrono::{NaiveDate, NaiveTime};

use shared_models::time_format::format_hhmm;
use shared_models::AppointmentDetails;

const FALLBACK_CLINIC: &str = "nossa clínica";

/// Display fields of one appointment.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub patient_name: String,
    pub professional_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub clinic_name: String,
}

impl MessageContext {
    pub fn from_details(details: &AppointmentDetails, clinic_name: Option<&str>) -> Self {
        Self {
            patient_name: details
                .patient
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            professional_name: details
                .profissional
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            date: details.appointment.date,
            time: details.appointment.time,
            clinic_name: clinic_name.unwrap_or(FALLBACK_CLINIC).to_string(),
        }
    }

    fn date_br(&self) -> String {
        format_date_br(self.date)
    }

    fn time_hhmm(&self) -> String {
        format_hhmm(&self.time)
    }
}

/// `dd/mm/yyyy`, straight from the calendar date.
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn booking_confirmation(ctx: &MessageContext) -> String {
    format!(
        "🏥 *Agendamento Confirmado*\n\n\
         Olá *{}*!\n\n\
         Seu agendamento foi confirmado com sucesso:\n\n\
         👨‍⚕️ *Profissional:* {}\n\
         📅 *Data:* {}\n\
         🕐 *Horário:* {}\n\
         🏥 *Clínica:* {}\n\n\
         ⚠️ *Importante:*\n\
         • Chegue 15 minutos antes do horário\n\
         • Traga seus documentos e exames\n\
         • Em caso de cancelamento, avise com antecedência\n\n\
         Qualquer dúvida, entre em contato conosco.\n\n\
         Obrigado! 😊",
        ctx.patient_name,
        ctx.professional_name,
        ctx.date_br(),
        ctx.time_hhmm(),
        ctx.clinic_name
    )
}

pub fn reminder(ctx: &MessageContext) -> String {
    format!(
        "🔔 *Lembrete de Consulta*\n\n\
         Olá *{}*!\n\n\
         Lembramos que você tem uma consulta agendada:\n\n\
         👨‍⚕️ *Profissional:* {}\n\
         📅 *Data:* {}\n\
         🕐 *Horário:* {}\n\
         🏥 *Clínica:* {}\n\n\
         Nos vemos em breve! 😊",
        ctx.patient_name,
        ctx.professional_name,
        ctx.date_br(),
        ctx.time_hhmm(),
        ctx.clinic_name
    )
}

pub fn confirmation_request(ctx: &MessageContext) -> String {
    format!(
        "📋 *Confirmação de Consulta*\n\n\
         Olá *{}*!\n\n\
         Você tem uma consulta agendada:\n\n\
         👨‍⚕️ *Profissional:* {}\n\
         📅 *Data:* {}\n\
         🕐 *Horário:* {}\n\
         🏥 *Clínica:* {}\n\n\
         Por favor, responda esta mensagem com:\n\
         ✅ *CONFIRMAR* para confirmar sua presença\n\
         ❌ *CANCELAR* para cancelar o agendamento\n\n\
         Obrigado! 😊",
        ctx.patient_name,
        ctx.professional_name,
        ctx.date_br(),
        ctx.time_hhmm(),
        ctx.clinic_name
    )
}

pub fn confirmed_reply(ctx: &MessageContext) -> String {
    format!(
        "✅ Agendamento confirmado com sucesso!\n\n\
         📅 Data: {}\n\
         🕐 Horário: {}\n\
         👨‍⚕️ Profissional: {}\n\n\
         Obrigado por confirmar!",
        ctx.date_br(),
        ctx.time_hhmm(),
        ctx.professional_name
    )
}

pub fn cancelled_reply(ctx: &MessageContext) -> String {
    format!(
        "❌ Agendamento cancelado.\n\n\
         📅 Data: {}\n\
         🕐 Horário: {}\n\n\
         Se precisar reagendar, entre em contato conosco.",
        ctx.date_br(),
        ctx.time_hhmm()
    )
}
